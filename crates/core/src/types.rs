//! Shared domain types for attribution analysis: touchpoints, journeys,
//! and the result structures returned to callers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Enums ──────────────────────────────────────────────────────────────

/// Type of a marketing interaction event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Impression,
    Click,
    Conversion,
    Purchase,
    Signup,
}

impl EventType {
    /// Parse an event type string, accepting the aliases commonly found in
    /// exported marketing data (`view`, `sale`, `register`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "impression" | "view" | "visit" | "pageview" => Some(Self::Impression),
            "click" | "ctr" => Some(Self::Click),
            "conversion" | "convert" | "sale" => Some(Self::Conversion),
            "purchase" | "buy" => Some(Self::Purchase),
            "signup" | "register" => Some(Self::Signup),
            _ => None,
        }
    }

    /// Whether this event completes a journey.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion | Self::Purchase)
    }
}

/// Strategy for linking touchpoints into per-customer journeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkingMethod {
    /// Pick the best concrete method from column coverage.
    Auto,
    CustomerId,
    SessionEmail,
    EmailOnly,
    Aggregate,
}

/// The five supported attribution models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    FirstTouch,
    LastTouch,
    Linear,
    TimeDecay,
    PositionBased,
}

// ─── Touchpoints & Journeys ─────────────────────────────────────────────

/// A validated marketing touchpoint. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Touchpoint {
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    pub event_type: EventType,
    pub customer_id: Option<String>,
    pub session_id: Option<String>,
    pub email: Option<String>,
    pub revenue: f64,
}

impl Touchpoint {
    pub fn is_conversion(&self) -> bool {
        self.event_type.is_conversion()
    }
}

/// An ordered sequence of touchpoints resolved to one identity.
///
/// Touchpoints are ascending by timestamp (input order preserved on ties)
/// and the sequence is never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    pub identity_key: String,
    pub touchpoints: Vec<Touchpoint>,
    pub converted: bool,
    pub total_revenue: f64,
}

impl Journey {
    /// Build a journey from already-ordered touchpoints, deriving the
    /// conversion flag and total revenue.
    pub fn new(identity_key: String, touchpoints: Vec<Touchpoint>) -> Self {
        let converted = touchpoints.iter().any(Touchpoint::is_conversion);
        let total_revenue = touchpoints.iter().map(|tp| tp.revenue).sum();
        Self {
            identity_key,
            touchpoints,
            converted,
            total_revenue,
        }
    }

    pub fn len(&self) -> usize {
        self.touchpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touchpoints.is_empty()
    }
}

// ─── Result Structures ──────────────────────────────────────────────────

/// Aggregated attribution for one channel across the whole dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelAttribution {
    /// Share of total attribution weight, in [0,1]. Sums to 1.0 across
    /// channels when at least one journey converted.
    pub credit: f64,
    /// Converting journeys in which this channel earned non-zero credit.
    pub conversions: u64,
    /// Revenue credited to this channel.
    pub revenue: f64,
    /// Channel-specific reliability score, in [0,1].
    pub confidence: f64,
}

/// Dataset-level summary statistics over all resolved journeys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionSummary {
    pub total_conversions: u64,
    pub total_revenue: f64,
    pub average_journey_length: f64,
    pub unique_customers: u64,
    pub attribution_window_days: u32,
}

/// Data-quality breakdown over the raw input table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQuality {
    pub completeness: f64,
    pub consistency: f64,
    pub freshness: f64,
}

impl DataQuality {
    /// Combined quality score: 0.4 completeness, 0.3 consistency,
    /// 0.3 freshness.
    pub fn overall(&self) -> f64 {
        self.completeness * 0.4 + self.consistency * 0.3 + self.freshness * 0.3
    }
}

/// How the analysis was performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub model_used: ModelKind,
    /// The concrete linking method applied (never `auto`).
    pub linking_method: LinkingMethod,
    pub confidence_score: f64,
    pub data_quality: DataQuality,
    pub records_analyzed: u64,
    pub records_dropped: u64,
    pub time_range_start: Option<DateTime<Utc>>,
    pub time_range_end: Option<DateTime<Utc>>,
    pub warnings: Vec<String>,
}

/// Journey length statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyLengthStats {
    pub average: f64,
    pub median: f64,
    pub distribution: BTreeMap<String, u64>,
}

/// One observed conversion path (channel sequence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionPath {
    pub path: String,
    pub frequency: u64,
    pub percentage: f64,
}

/// Time from first touch to first conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeToConversionStats {
    pub average_days: f64,
    pub median_days: f64,
    pub distribution: BTreeMap<String, u64>,
}

/// Optional reporting extension over the resolved journey set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyAnalysis {
    pub lengths: JourneyLengthStats,
    pub top_paths: Vec<ConversionPath>,
    pub time_to_conversion: TimeToConversionStats,
}

/// Complete output of one attribution analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionResult {
    pub channel_attribution: BTreeMap<String, ChannelAttribution>,
    pub summary: AttributionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journey_analysis: Option<JourneyAnalysis>,
    pub metadata: AnalysisMetadata,
}
