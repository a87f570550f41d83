//! Confidence scoring — data-quality metrics over the raw table combined
//! with identity and model certainty into an overall reliability score.

pub mod quality;
pub mod scorer;

pub use quality::DataQualityAnalyzer;
pub use scorer::ConfidenceScorer;
