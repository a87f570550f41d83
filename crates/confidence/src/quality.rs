//! Data-quality metrics computed once over the whole input table.

use chrono::{DateTime, Utc};
use touchflow_core::table::TouchpointTable;
use touchflow_core::types::DataQuality;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Field importance weights for the completeness score. Required fields
/// count fully, identity keys half, revenue a quarter (it is legitimately
/// absent on non-conversion rows).
const REQUIRED_FIELD_WEIGHT: f64 = 1.0;
const IDENTITY_FIELD_WEIGHT: f64 = 0.5;
const REVENUE_FIELD_WEIGHT: f64 = 0.25;

/// Computes completeness / consistency / freshness over a raw table.
///
/// `now` is injected by the caller so freshness is reproducible in tests;
/// everything else is a pure function of the table.
#[derive(Debug, Clone)]
pub struct DataQualityAnalyzer {
    freshness_horizon_days: u32,
}

impl Default for DataQualityAnalyzer {
    fn default() -> Self {
        Self::new(90)
    }
}

impl DataQualityAnalyzer {
    pub fn new(freshness_horizon_days: u32) -> Self {
        Self {
            freshness_horizon_days,
        }
    }

    pub fn assess(&self, table: &TouchpointTable, now: DateTime<Utc>) -> DataQuality {
        if table.is_empty() {
            return DataQuality {
                completeness: 0.0,
                consistency: 0.0,
                freshness: 0.0,
            };
        }
        DataQuality {
            completeness: self.completeness(table),
            consistency: table.fraction(|r| r.is_consistent()),
            freshness: self.freshness(table, now),
        }
    }

    /// Importance-weighted mean of per-column non-null fractions.
    fn completeness(&self, table: &TouchpointTable) -> f64 {
        let weighted = [
            (
                REQUIRED_FIELD_WEIGHT,
                table.fraction(|r| r.timestamp.as_deref().is_some_and(|v| !v.trim().is_empty())),
            ),
            (
                REQUIRED_FIELD_WEIGHT,
                table.fraction(|r| r.channel_name().is_some()),
            ),
            (
                REQUIRED_FIELD_WEIGHT,
                table.fraction(|r| r.event_type.as_deref().is_some_and(|v| !v.trim().is_empty())),
            ),
            (IDENTITY_FIELD_WEIGHT, table.coverage().customer_id),
            (IDENTITY_FIELD_WEIGHT, table.coverage().session_id),
            (IDENTITY_FIELD_WEIGHT, table.coverage().email),
            (
                REVENUE_FIELD_WEIGHT,
                table.fraction(|r| r.revenue.is_some()),
            ),
        ];

        let total_weight: f64 = weighted.iter().map(|(w, _)| w).sum();
        weighted.iter().map(|(w, f)| w * f).sum::<f64>() / total_weight
    }

    /// 1.0 when the newest record is within a day of `now`, decaying
    /// linearly to 0.0 at the horizon. No parseable timestamp scores 0.
    fn freshness(&self, table: &TouchpointTable, now: DateTime<Utc>) -> f64 {
        let newest = table
            .records()
            .iter()
            .filter_map(|r| r.parse_timestamp())
            .max();
        let newest = match newest {
            Some(ts) => ts,
            None => return 0.0,
        };

        let age_days = (now - newest).num_seconds() as f64 / SECONDS_PER_DAY;
        let horizon = f64::from(self.freshness_horizon_days);
        if age_days <= 1.0 {
            1.0
        } else if age_days >= horizon {
            0.0
        } else {
            1.0 - (age_days - 1.0) / (horizon - 1.0)
        }
    }
}
