//! Identity resolution — links raw touchpoint rows into ordered
//! per-customer journeys under a selectable linking strategy.

pub mod journey;
pub mod resolver;

pub use resolver::{select_linking_method, IdentityResolver, Resolution};
