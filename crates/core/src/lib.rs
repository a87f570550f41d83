pub mod config;
pub mod error;
pub mod table;
pub mod types;

pub use config::AppConfig;
pub use error::{AttributionError, CoreResult};
