//! The attribution model set — five interchangeable credit-assignment
//! strategies over a single customer journey.

pub mod model;

pub use model::{AttributionModel, ModelSpec};
