//! Journey assembly: ordering, attribution-window filtering, and derived
//! journey fields.

use chrono::Duration;
use touchflow_core::types::{Journey, Touchpoint};

/// Build a journey from one identity group.
///
/// Touchpoints are stable-sorted ascending by timestamp (equal timestamps
/// keep their input order), then filtered to the attribution window: the
/// anchor is the last conversion touchpoint, or the last touchpoint when
/// none converts, and only touchpoints within `window_days` before the
/// anchor (inclusive of the anchor itself) are retained.
///
/// Returns `None` when no touchpoints remain.
pub fn build_journey(
    identity_key: String,
    mut touchpoints: Vec<Touchpoint>,
    window_days: u32,
) -> Option<Journey> {
    if touchpoints.is_empty() {
        return None;
    }

    touchpoints.sort_by_key(|tp| tp.timestamp);

    let anchor = touchpoints
        .iter()
        .rev()
        .find(|tp| tp.is_conversion())
        .or_else(|| touchpoints.last())?
        .timestamp;
    let window_start = anchor - Duration::days(i64::from(window_days));
    touchpoints.retain(|tp| tp.timestamp >= window_start && tp.timestamp <= anchor);

    if touchpoints.is_empty() {
        return None;
    }
    Some(Journey::new(identity_key, touchpoints))
}
