//! The touchpoint table — raw rows as handed over by the ingestion layer,
//! with column statistics and per-row validation.
//!
//! The ingestion layer owns file decoding and schema detection; this module
//! owns turning loosely-typed rows into validated [`Touchpoint`]s, dropping
//! malformed rows instead of aborting the analysis.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{EventType, Touchpoint};

/// One raw touchpoint row. Every field is optional: real exports routinely
/// miss identity columns, and timestamp/revenue may fail to coerce upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub revenue: Option<f64>,
}

impl RawRecord {
    /// Parse the timestamp field. Accepts RFC 3339 plus the plain
    /// `YYYY-MM-DD HH:MM:SS` and date-only forms common in CSV exports.
    pub fn parse_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(NaiveDateTime::new(date, NaiveTime::MIN).and_utc());
        }
        None
    }

    /// Non-empty channel name, if any.
    pub fn channel_name(&self) -> Option<&str> {
        self.channel
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Whether this row passes all type/format checks: parseable timestamp,
    /// non-empty channel, recognized event type, non-negative revenue.
    pub fn is_consistent(&self) -> bool {
        self.parse_timestamp().is_some()
            && self.channel_name().is_some()
            && self
                .event_type
                .as_deref()
                .and_then(EventType::parse)
                .is_some()
            && self.revenue.map_or(true, |r| r >= 0.0)
    }
}

/// Non-null fraction per identity column, used for linking-method selection
/// and completeness scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnCoverage {
    pub customer_id: f64,
    pub session_id: f64,
    pub email: f64,
}

/// An ordered collection of raw touchpoint rows. Input row order is
/// preserved; it is the tie-break for equal timestamps downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TouchpointTable {
    records: Vec<RawRecord>,
}

impl TouchpointTable {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Non-null fraction for each identity column.
    pub fn coverage(&self) -> ColumnCoverage {
        ColumnCoverage {
            customer_id: self.fraction(|r| non_empty(&r.customer_id)),
            session_id: self.fraction(|r| non_empty(&r.session_id)),
            email: self.fraction(|r| non_empty(&r.email)),
        }
    }

    /// Fraction of rows matching a predicate; 0.0 for an empty table.
    pub fn fraction(&self, predicate: impl Fn(&RawRecord) -> bool) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let matching = self.records.iter().filter(|r| predicate(r)).count();
        matching as f64 / self.records.len() as f64
    }

    /// Validate rows into typed touchpoints, preserving input order.
    ///
    /// A row is dropped when its timestamp does not parse, its channel is
    /// missing or empty, or its revenue is negative. An unrecognized event
    /// type falls back to `impression` rather than dropping the row.
    /// Returns the touchpoints and the count of dropped rows.
    pub fn validate(&self) -> (Vec<Touchpoint>, usize) {
        let mut touchpoints = Vec::with_capacity(self.records.len());
        let mut dropped = 0usize;

        for record in &self.records {
            let timestamp = match record.parse_timestamp() {
                Some(ts) => ts,
                None => {
                    dropped += 1;
                    continue;
                }
            };
            let channel = match record.channel_name() {
                Some(c) => c.to_string(),
                None => {
                    dropped += 1;
                    continue;
                }
            };
            let revenue = match record.revenue {
                Some(r) if r < 0.0 => {
                    dropped += 1;
                    continue;
                }
                Some(r) => r,
                None => 0.0,
            };
            let event_type = record
                .event_type
                .as_deref()
                .and_then(EventType::parse)
                .unwrap_or(EventType::Impression);

            touchpoints.push(Touchpoint {
                timestamp,
                channel,
                event_type,
                customer_id: record.customer_id.clone().filter(|v| !v.trim().is_empty()),
                session_id: record.session_id.clone().filter(|v| !v.trim().is_empty()),
                email: record.email.clone().filter(|v| !v.trim().is_empty()),
                revenue,
            });
        }

        if dropped > 0 {
            debug!(dropped, total = self.records.len(), "malformed rows dropped");
        }
        (touchpoints, dropped)
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
