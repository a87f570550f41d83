//! Analysis history — an explicit repository for past results, injected by
//! the caller instead of living as ambient global state.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use touchflow_core::types::AttributionResult;
use tracing::info;
use uuid::Uuid;

/// A stored analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub result: AttributionResult,
}

/// Repository abstraction over analysis history. The engine itself never
/// writes to it; callers that want history pass results in explicitly.
pub trait AnalysisHistory: Send + Sync {
    fn record(&self, result: AttributionResult) -> Uuid;
    fn get(&self, id: Uuid) -> Option<AnalysisRecord>;
    /// All records, oldest first.
    fn list(&self) -> Vec<AnalysisRecord>;
    fn count(&self) -> usize;
}

/// In-memory history store.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: DashMap<Uuid, AnalysisRecord>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalysisHistory for InMemoryHistory {
    fn record(&self, result: AttributionResult) -> Uuid {
        let id = Uuid::new_v4();
        self.records.insert(
            id,
            AnalysisRecord {
                id,
                recorded_at: Utc::now(),
                result,
            },
        );
        info!(analysis_id = %id, "analysis result recorded");
        id
    }

    fn get(&self, id: Uuid) -> Option<AnalysisRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    fn list(&self) -> Vec<AnalysisRecord> {
        let mut records: Vec<AnalysisRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
        records
    }

    fn count(&self) -> usize {
        self.records.len()
    }
}
