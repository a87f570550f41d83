//! Journey analysis — structural statistics over the resolved journey set:
//! length distribution, common conversion paths, time to conversion.

use std::collections::{BTreeMap, HashMap};

use touchflow_core::types::{
    ConversionPath, Journey, JourneyAnalysis, JourneyLengthStats, TimeToConversionStats,
};

const SECONDS_PER_DAY: f64 = 86_400.0;
const TOP_PATH_LIMIT: usize = 10;

const LENGTH_BUCKETS: [&str; 5] = [
    "1_touchpoint",
    "2_touchpoints",
    "3_5_touchpoints",
    "6_10_touchpoints",
    "11_plus_touchpoints",
];

const TIME_BUCKETS: [&str; 5] = [
    "same_day",
    "1_7_days",
    "8_30_days",
    "31_90_days",
    "90_plus_days",
];

/// Computes the optional `journey_analysis` section of a result.
pub struct JourneyAnalyzer;

impl JourneyAnalyzer {
    pub fn analyze(journeys: &[Journey]) -> JourneyAnalysis {
        JourneyAnalysis {
            lengths: length_stats(journeys),
            top_paths: top_paths(journeys),
            time_to_conversion: time_to_conversion(journeys),
        }
    }
}

fn length_stats(journeys: &[Journey]) -> JourneyLengthStats {
    let mut distribution: BTreeMap<String, u64> = LENGTH_BUCKETS
        .iter()
        .map(|b| (b.to_string(), 0))
        .collect();
    let mut lengths: Vec<f64> = Vec::with_capacity(journeys.len());

    for journey in journeys {
        let n = journey.len();
        lengths.push(n as f64);
        let bucket = match n {
            1 => LENGTH_BUCKETS[0],
            2 => LENGTH_BUCKETS[1],
            3..=5 => LENGTH_BUCKETS[2],
            6..=10 => LENGTH_BUCKETS[3],
            _ => LENGTH_BUCKETS[4],
        };
        if let Some(count) = distribution.get_mut(bucket) {
            *count += 1;
        }
    }

    JourneyLengthStats {
        average: mean(&lengths),
        median: median(&mut lengths),
        distribution,
    }
}

/// Most frequent conversion paths, ordered by frequency then path so the
/// ranking is stable.
fn top_paths(journeys: &[Journey]) -> Vec<ConversionPath> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut total = 0u64;
    for journey in journeys.iter().filter(|j| j.converted) {
        let path = journey
            .touchpoints
            .iter()
            .map(|tp| tp.channel.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");
        *counts.entry(path).or_insert(0) += 1;
        total += 1;
    }

    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(TOP_PATH_LIMIT)
        .map(|(path, frequency)| ConversionPath {
            path,
            frequency,
            percentage: frequency as f64 / total as f64 * 100.0,
        })
        .collect()
}

/// Days from a journey's first touchpoint to its first conversion event.
fn time_to_conversion(journeys: &[Journey]) -> TimeToConversionStats {
    let mut distribution: BTreeMap<String, u64> =
        TIME_BUCKETS.iter().map(|b| (b.to_string(), 0)).collect();
    let mut days: Vec<f64> = Vec::new();

    for journey in journeys.iter().filter(|j| j.converted) {
        let first = match journey.touchpoints.first() {
            Some(tp) => tp.timestamp,
            None => continue,
        };
        let conversion = match journey.touchpoints.iter().find(|tp| tp.is_conversion()) {
            Some(tp) => tp.timestamp,
            None => continue,
        };
        let elapsed = (conversion - first).num_seconds() as f64 / SECONDS_PER_DAY;
        days.push(elapsed);

        let bucket = if elapsed < 1.0 {
            TIME_BUCKETS[0]
        } else if elapsed <= 7.0 {
            TIME_BUCKETS[1]
        } else if elapsed <= 30.0 {
            TIME_BUCKETS[2]
        } else if elapsed <= 90.0 {
            TIME_BUCKETS[3]
        } else {
            TIME_BUCKETS[4]
        };
        if let Some(count) = distribution.get_mut(bucket) {
            *count += 1;
        }
    }

    TimeToConversionStats {
        average_days: mean(&days),
        median_days: median(&mut days),
        distribution,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use touchflow_core::types::{EventType, Touchpoint};

    fn tp(timestamp: &str, channel: &str, event_type: EventType) -> Touchpoint {
        Touchpoint {
            timestamp: timestamp.parse::<DateTime<Utc>>().unwrap(),
            channel: channel.to_string(),
            event_type,
            customer_id: None,
            session_id: None,
            email: None,
            revenue: 0.0,
        }
    }

    fn converting_journey(key: &str, channels: &[&str]) -> Journey {
        let touchpoints = channels
            .iter()
            .enumerate()
            .map(|(i, channel)| {
                let event_type = if i == channels.len() - 1 {
                    EventType::Conversion
                } else {
                    EventType::Click
                };
                tp(
                    &format!("2024-03-{:02}T00:00:00Z", i + 1),
                    channel,
                    event_type,
                )
            })
            .collect();
        Journey::new(key.to_string(), touchpoints)
    }

    #[test]
    fn test_length_distribution_buckets() {
        let journeys = vec![
            converting_journey("a", &["email"]),
            converting_journey("b", &["email", "direct"]),
            converting_journey("c", &["email", "social", "direct"]),
            converting_journey("d", &["a", "b", "c", "d", "e", "f", "g"]),
        ];
        let analysis = JourneyAnalyzer::analyze(&journeys);

        assert_eq!(analysis.lengths.distribution["1_touchpoint"], 1);
        assert_eq!(analysis.lengths.distribution["2_touchpoints"], 1);
        assert_eq!(analysis.lengths.distribution["3_5_touchpoints"], 1);
        assert_eq!(analysis.lengths.distribution["6_10_touchpoints"], 1);
        assert_eq!(analysis.lengths.distribution["11_plus_touchpoints"], 0);
        assert!((analysis.lengths.average - 13.0 / 4.0).abs() < 1e-9);
        assert!((analysis.lengths.median - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_top_paths_ranked_by_frequency_with_stable_ties() {
        let journeys = vec![
            converting_journey("a", &["email", "direct"]),
            converting_journey("b", &["email", "direct"]),
            converting_journey("c", &["social", "direct"]),
            converting_journey("d", &["display", "direct"]),
            Journey::new(
                "e".to_string(),
                vec![tp("2024-03-01T00:00:00Z", "email", EventType::Click)],
            ),
        ];
        let analysis = JourneyAnalyzer::analyze(&journeys);

        assert_eq!(analysis.top_paths.len(), 3);
        assert_eq!(analysis.top_paths[0].path, "email -> direct");
        assert_eq!(analysis.top_paths[0].frequency, 2);
        assert!((analysis.top_paths[0].percentage - 50.0).abs() < 1e-9);
        // Tie between the single-count paths breaks alphabetically.
        assert_eq!(analysis.top_paths[1].path, "display -> direct");
        assert_eq!(analysis.top_paths[2].path, "social -> direct");
    }

    #[test]
    fn test_time_to_conversion_stats() {
        let quick = Journey::new(
            "quick".to_string(),
            vec![
                tp("2024-03-01T00:00:00Z", "email", EventType::Click),
                tp("2024-03-01T06:00:00Z", "direct", EventType::Conversion),
            ],
        );
        let slow = Journey::new(
            "slow".to_string(),
            vec![
                tp("2024-03-01T00:00:00Z", "email", EventType::Click),
                tp("2024-03-15T00:00:00Z", "direct", EventType::Conversion),
            ],
        );
        let analysis = JourneyAnalyzer::analyze(&[quick, slow]);

        let stats = analysis.time_to_conversion;
        assert_eq!(stats.distribution["same_day"], 1);
        assert_eq!(stats.distribution["8_30_days"], 1);
        assert!((stats.average_days - (0.25 + 14.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_journeys_yields_zeroed_stats() {
        let analysis = JourneyAnalyzer::analyze(&[]);
        assert_eq!(analysis.lengths.average, 0.0);
        assert_eq!(analysis.lengths.median, 0.0);
        assert!(analysis.top_paths.is_empty());
        assert_eq!(analysis.time_to_conversion.average_days, 0.0);
        assert!(analysis
            .time_to_conversion
            .distribution
            .values()
            .all(|&c| c == 0));
    }
}
