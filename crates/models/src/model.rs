//! Model parameter validation and per-journey credit calculation.
//!
//! Each model maps one journey to a per-channel credit split. Credits over
//! the unique channels of a non-empty journey always sum to 1.0; a channel
//! appearing multiple times has its per-touchpoint shares summed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use touchflow_core::error::AttributionError;
use touchflow_core::types::{Journey, ModelKind};
use touchflow_core::CoreResult;

pub const DEFAULT_HALF_LIFE_DAYS: f64 = 7.0;
pub const DEFAULT_FIRST_TOUCH_WEIGHT: f64 = 0.4;
pub const DEFAULT_LAST_TOUCH_WEIGHT: f64 = 0.4;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Caller-facing model selection: a kind plus optional parameters.
/// Unset parameters take the documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    #[serde(default)]
    pub half_life_days: Option<f64>,
    #[serde(default)]
    pub first_touch_weight: Option<f64>,
    #[serde(default)]
    pub last_touch_weight: Option<f64>,
}

impl ModelSpec {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            half_life_days: None,
            first_touch_weight: None,
            last_touch_weight: None,
        }
    }

    /// Validate parameters and construct the model. Fails fast with
    /// `InvalidParameter` before any journey is processed.
    pub fn build(&self) -> CoreResult<AttributionModel> {
        match self.kind {
            ModelKind::FirstTouch => Ok(AttributionModel::FirstTouch),
            ModelKind::LastTouch => Ok(AttributionModel::LastTouch),
            ModelKind::Linear => Ok(AttributionModel::Linear),
            ModelKind::TimeDecay => {
                let half_life_days = self.half_life_days.unwrap_or(DEFAULT_HALF_LIFE_DAYS);
                if !(half_life_days > 0.0) || !half_life_days.is_finite() {
                    return Err(AttributionError::InvalidParameter(format!(
                        "time decay half-life must be a positive number of days, got {half_life_days}"
                    )));
                }
                Ok(AttributionModel::TimeDecay { half_life_days })
            }
            ModelKind::PositionBased => {
                let first_touch_weight = self
                    .first_touch_weight
                    .unwrap_or(DEFAULT_FIRST_TOUCH_WEIGHT);
                let last_touch_weight =
                    self.last_touch_weight.unwrap_or(DEFAULT_LAST_TOUCH_WEIGHT);
                for (name, weight) in [
                    ("first_touch_weight", first_touch_weight),
                    ("last_touch_weight", last_touch_weight),
                ] {
                    if !(0.0..=1.0).contains(&weight) {
                        return Err(AttributionError::InvalidParameter(format!(
                            "{name} must be within [0, 1], got {weight}"
                        )));
                    }
                }
                if first_touch_weight + last_touch_weight > 1.0 {
                    return Err(AttributionError::InvalidParameter(format!(
                        "first_touch_weight + last_touch_weight must not exceed 1.0, got {}",
                        first_touch_weight + last_touch_weight
                    )));
                }
                Ok(AttributionModel::PositionBased {
                    first_touch_weight,
                    last_touch_weight,
                })
            }
        }
    }
}

/// A validated attribution model. The set is closed: adding a model is a
/// deliberate extension of this enum, not plugin registration.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributionModel {
    FirstTouch,
    LastTouch,
    Linear,
    TimeDecay {
        half_life_days: f64,
    },
    PositionBased {
        first_touch_weight: f64,
        last_touch_weight: f64,
    },
}

impl AttributionModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::FirstTouch => ModelKind::FirstTouch,
            Self::LastTouch => ModelKind::LastTouch,
            Self::Linear => ModelKind::Linear,
            Self::TimeDecay { .. } => ModelKind::TimeDecay,
            Self::PositionBased { .. } => ModelKind::PositionBased,
        }
    }

    /// Credit split for one journey, keyed by channel.
    ///
    /// Returns an empty map for an empty journey (the resolver never
    /// produces one).
    pub fn calculate(&self, journey: &Journey) -> BTreeMap<String, f64> {
        match self {
            Self::FirstTouch => single_touch(journey.touchpoints.first()),
            Self::LastTouch => single_touch(journey.touchpoints.last()),
            Self::Linear => linear(journey),
            Self::TimeDecay { half_life_days } => time_decay(journey, *half_life_days),
            Self::PositionBased {
                first_touch_weight,
                last_touch_weight,
            } => position_based(journey, *first_touch_weight, *last_touch_weight),
        }
    }
}

fn single_touch(touchpoint: Option<&touchflow_core::types::Touchpoint>) -> BTreeMap<String, f64> {
    let mut credits = BTreeMap::new();
    if let Some(tp) = touchpoint {
        credits.insert(tp.channel.clone(), 1.0);
    }
    credits
}

fn linear(journey: &Journey) -> BTreeMap<String, f64> {
    let mut credits = BTreeMap::new();
    if journey.is_empty() {
        return credits;
    }
    let per_touchpoint = 1.0 / journey.len() as f64;
    for tp in &journey.touchpoints {
        *credits.entry(tp.channel.clone()).or_insert(0.0) += per_touchpoint;
    }
    credits
}

/// Exponential decay toward the terminal touchpoint: a touchpoint half a
/// half-life old carries `2^(-0.5)` of the terminal weight. Raw weights
/// are normalized to sum to 1.0.
fn time_decay(journey: &Journey, half_life_days: f64) -> BTreeMap<String, f64> {
    let mut credits = BTreeMap::new();
    let terminal = match journey.touchpoints.last() {
        Some(tp) => tp.timestamp,
        None => return credits,
    };

    let weights: Vec<f64> = journey
        .touchpoints
        .iter()
        .map(|tp| {
            let days_before = (terminal - tp.timestamp).num_seconds() as f64 / SECONDS_PER_DAY;
            2f64.powf(-days_before / half_life_days)
        })
        .collect();
    let total: f64 = weights.iter().sum();

    for (tp, weight) in journey.touchpoints.iter().zip(&weights) {
        *credits.entry(tp.channel.clone()).or_insert(0.0) += weight / total;
    }
    credits
}

fn position_based(
    journey: &Journey,
    first_touch_weight: f64,
    last_touch_weight: f64,
) -> BTreeMap<String, f64> {
    let mut credits = BTreeMap::new();
    let n = journey.len();
    match n {
        0 => {}
        1 => {
            credits.insert(journey.touchpoints[0].channel.clone(), 1.0);
        }
        2 => {
            // No middle touchpoints to hold the remainder: renormalize the
            // endpoint weights proportionally so credits still sum to 1.0.
            let endpoint_sum = first_touch_weight + last_touch_weight;
            let (first, last) = if endpoint_sum > 0.0 {
                (
                    first_touch_weight / endpoint_sum,
                    last_touch_weight / endpoint_sum,
                )
            } else {
                (0.5, 0.5)
            };
            *credits
                .entry(journey.touchpoints[0].channel.clone())
                .or_insert(0.0) += first;
            *credits
                .entry(journey.touchpoints[1].channel.clone())
                .or_insert(0.0) += last;
        }
        _ => {
            let middle_each =
                (1.0 - first_touch_weight - last_touch_weight) / (n as f64 - 2.0);
            for (i, tp) in journey.touchpoints.iter().enumerate() {
                let share = if i == 0 {
                    first_touch_weight
                } else if i == n - 1 {
                    last_touch_weight
                } else {
                    middle_each
                };
                *credits.entry(tp.channel.clone()).or_insert(0.0) += share;
            }
        }
    }
    credits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use touchflow_core::types::{EventType, Touchpoint};

    fn tp(timestamp: &str, channel: &str) -> Touchpoint {
        Touchpoint {
            timestamp: timestamp.parse::<DateTime<Utc>>().unwrap(),
            channel: channel.to_string(),
            event_type: EventType::Click,
            customer_id: None,
            session_id: None,
            email: None,
            revenue: 0.0,
        }
    }

    fn journey(touchpoints: Vec<Touchpoint>) -> Journey {
        Journey::new("test".to_string(), touchpoints)
    }

    fn four_channel_journey() -> Journey {
        journey(vec![
            tp("2024-03-01T00:00:00Z", "display"),
            tp("2024-03-02T00:00:00Z", "social"),
            tp("2024-03-03T00:00:00Z", "email"),
            tp("2024-03-04T00:00:00Z", "direct"),
        ])
    }

    fn all_models() -> Vec<AttributionModel> {
        [
            ModelKind::FirstTouch,
            ModelKind::LastTouch,
            ModelKind::Linear,
            ModelKind::TimeDecay,
            ModelKind::PositionBased,
        ]
        .into_iter()
        .map(|kind| ModelSpec::new(kind).build().unwrap())
        .collect()
    }

    fn credit_sum(credits: &BTreeMap<String, f64>) -> f64 {
        credits.values().sum()
    }

    #[test]
    fn test_credits_sum_to_one_for_every_model() {
        let j = four_channel_journey();
        for model in all_models() {
            let credits = model.calculate(&j);
            assert!(
                (credit_sum(&credits) - 1.0).abs() < 1e-9,
                "{:?} credits do not sum to 1.0",
                model.kind()
            );
        }
    }

    #[test]
    fn test_single_touchpoint_gets_full_credit_in_every_model() {
        let j = journey(vec![tp("2024-03-01T00:00:00Z", "paid_search")]);
        for model in all_models() {
            let credits = model.calculate(&j);
            assert_eq!(credits.len(), 1);
            assert!((credits["paid_search"] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_first_touch_credits_first_channel() {
        let credits = AttributionModel::FirstTouch.calculate(&four_channel_journey());
        assert!((credits["display"] - 1.0).abs() < 1e-9);
        assert_eq!(credits.len(), 1);
    }

    #[test]
    fn test_last_touch_credits_last_channel() {
        let credits = AttributionModel::LastTouch.calculate(&four_channel_journey());
        assert!((credits["direct"] - 1.0).abs() < 1e-9);
        assert_eq!(credits.len(), 1);
    }

    #[test]
    fn test_linear_credit_is_occurrences_over_n() {
        let j = journey(vec![
            tp("2024-03-01T00:00:00Z", "email"),
            tp("2024-03-02T00:00:00Z", "social"),
            tp("2024-03-03T00:00:00Z", "email"),
            tp("2024-03-04T00:00:00Z", "direct"),
        ]);
        let credits = AttributionModel::Linear.calculate(&j);
        assert!((credits["email"] - 0.5).abs() < 1e-9);
        assert!((credits["social"] - 0.25).abs() < 1e-9);
        assert!((credits["direct"] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_time_decay_terminal_channel_dominates() {
        for half_life_days in [0.5, 7.0, 30.0] {
            let model = AttributionModel::TimeDecay { half_life_days };
            let credits = model.calculate(&four_channel_journey());
            let terminal = credits["direct"];
            for (channel, credit) in &credits {
                assert!(
                    terminal >= *credit,
                    "terminal credit {terminal} < {channel} credit {credit} at half-life {half_life_days}"
                );
            }
        }
    }

    #[test]
    fn test_time_decay_half_life_halves_weight() {
        let j = journey(vec![
            tp("2024-03-01T00:00:00Z", "email"),
            tp("2024-03-08T00:00:00Z", "direct"),
        ]);
        let credits = AttributionModel::TimeDecay {
            half_life_days: 7.0,
        }
        .calculate(&j);
        // Raw weights 0.5 and 1.0, normalized.
        assert!((credits["email"] - 1.0 / 3.0).abs() < 1e-9);
        assert!((credits["direct"] - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_based_default_weights() {
        let credits = ModelSpec::new(ModelKind::PositionBased)
            .build()
            .unwrap()
            .calculate(&four_channel_journey());
        assert!((credits["display"] - 0.4).abs() < 1e-9);
        assert!((credits["social"] - 0.1).abs() < 1e-9);
        assert!((credits["email"] - 0.1).abs() < 1e-9);
        assert!((credits["direct"] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_position_based_two_touchpoints_renormalized() {
        let j = journey(vec![
            tp("2024-03-01T00:00:00Z", "email"),
            tp("2024-03-02T00:00:00Z", "direct"),
        ]);

        // Asymmetric weights make the renormalization visible:
        // 0.6/(0.6+0.2) = 0.75, 0.2/(0.6+0.2) = 0.25.
        let mut spec = ModelSpec::new(ModelKind::PositionBased);
        spec.first_touch_weight = Some(0.6);
        spec.last_touch_weight = Some(0.2);
        let credits = spec.build().unwrap().calculate(&j);
        assert!((credits["email"] - 0.75).abs() < 1e-9);
        assert!((credits["direct"] - 0.25).abs() < 1e-9);
        assert!((credit_sum(&credits) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_based_repeated_channel_shares_summed() {
        let j = journey(vec![
            tp("2024-03-01T00:00:00Z", "email"),
            tp("2024-03-02T00:00:00Z", "social"),
            tp("2024-03-03T00:00:00Z", "email"),
        ]);
        let credits = ModelSpec::new(ModelKind::PositionBased)
            .build()
            .unwrap()
            .calculate(&j);
        // email holds first (0.4) and last (0.4) position.
        assert!((credits["email"] - 0.8).abs() < 1e-9);
        assert!((credits["social"] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_half_life_rejected() {
        for bad in [0.0, -7.0, f64::NAN] {
            let mut spec = ModelSpec::new(ModelKind::TimeDecay);
            spec.half_life_days = Some(bad);
            assert!(matches!(
                spec.build(),
                Err(AttributionError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_invalid_position_weights_rejected() {
        let cases = [
            (Some(-0.1), Some(0.4)),
            (Some(0.4), Some(1.5)),
            (Some(0.7), Some(0.7)),
            (Some(f64::NAN), Some(0.4)),
        ];
        for (first, last) in cases {
            let mut spec = ModelSpec::new(ModelKind::PositionBased);
            spec.first_touch_weight = first;
            spec.last_touch_weight = last;
            assert!(
                matches!(spec.build(), Err(AttributionError::InvalidParameter(_))),
                "weights {first:?}/{last:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_defaults_applied_when_parameters_unset() {
        let decay = ModelSpec::new(ModelKind::TimeDecay).build().unwrap();
        assert_eq!(
            decay,
            AttributionModel::TimeDecay {
                half_life_days: DEFAULT_HALF_LIFE_DAYS
            }
        );
        let position = ModelSpec::new(ModelKind::PositionBased).build().unwrap();
        assert_eq!(
            position,
            AttributionModel::PositionBased {
                first_touch_weight: DEFAULT_FIRST_TOUCH_WEIGHT,
                last_touch_weight: DEFAULT_LAST_TOUCH_WEIGHT
            }
        );
    }
}
