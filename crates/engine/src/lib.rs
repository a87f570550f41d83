//! The attribution engine — runs identity resolution, the selected
//! attribution model, and confidence scoring across a touchpoint table
//! and aggregates the result. This is the entry point the surrounding
//! API layer calls.

pub mod history;
pub mod insights;
pub mod service;

pub use history::{AnalysisHistory, AnalysisRecord, InMemoryHistory};
pub use insights::JourneyAnalyzer;
pub use service::{AnalysisRequest, AttributionService};
