//! Overall and per-channel confidence scoring.

use touchflow_core::types::{DataQuality, Journey, ModelKind};
use tracing::debug;

/// Weights for the overall confidence combination. They sum to 1.0.
const DATA_QUALITY_WEIGHT: f64 = 0.35;
const IDENTITY_WEIGHT: f64 = 0.30;
const MODEL_FIT_WEIGHT: f64 = 0.20;
const SAMPLE_SIZE_WEIGHT: f64 = 0.15;

/// Fit confidence for models without parametric assumptions.
const BASELINE_MODEL_FIT: f64 = 0.9;
/// How strongly a single-touch-dominated dataset discounts parametric models.
const SKEW_PENALTY: f64 = 0.4;

/// Combines data quality, identity confidence, model fit, and sample size
/// into advisory [0,1] scores. Confidence never blocks a computation.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    sample_size_threshold: u32,
    channel_sample_threshold: u32,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(100, 10)
    }
}

impl ConfidenceScorer {
    pub fn new(sample_size_threshold: u32, channel_sample_threshold: u32) -> Self {
        Self {
            sample_size_threshold,
            channel_sample_threshold,
        }
    }

    /// Overall confidence:
    /// 0.35 data quality + 0.30 identity + 0.20 model fit + 0.15 sample size.
    pub fn overall(
        &self,
        quality: &DataQuality,
        identity_confidence: f64,
        model_kind: ModelKind,
        journeys: &[Journey],
    ) -> f64 {
        let model_fit = self.model_fit(model_kind, journeys);
        let sample_factor = log_scaled(journeys.len(), self.sample_size_threshold);

        let score = DATA_QUALITY_WEIGHT * quality.overall()
            + IDENTITY_WEIGHT * identity_confidence
            + MODEL_FIT_WEIGHT * model_fit
            + SAMPLE_SIZE_WEIGHT * sample_factor;
        debug!(
            data_quality = quality.overall(),
            identity_confidence, model_fit, sample_factor, "confidence components"
        );
        score.clamp(0.0, 1.0)
    }

    /// First/last/linear carry no parameters to violate; time-decay and
    /// position-based become unobservable when most journeys have a single
    /// touchpoint, so their fit drops with that fraction.
    pub fn model_fit(&self, model_kind: ModelKind, journeys: &[Journey]) -> f64 {
        match model_kind {
            ModelKind::FirstTouch | ModelKind::LastTouch | ModelKind::Linear => BASELINE_MODEL_FIT,
            ModelKind::TimeDecay | ModelKind::PositionBased => {
                if journeys.is_empty() {
                    return BASELINE_MODEL_FIT;
                }
                let single_touch = journeys.iter().filter(|j| j.len() == 1).count();
                let skew = single_touch as f64 / journeys.len() as f64;
                (BASELINE_MODEL_FIT - SKEW_PENALTY * skew).clamp(0.0, 1.0)
            }
        }
    }

    /// Channel-level confidence: the overall score discounted by how few
    /// journeys actually contained the channel.
    pub fn channel_confidence(&self, overall: f64, channel_journeys: usize) -> f64 {
        (overall * log_scaled(channel_journeys, self.channel_sample_threshold)).clamp(0.0, 1.0)
    }
}

/// `min(1, ln(n+1)/ln(threshold+1))`: small samples cap confidence, the
/// factor saturating once `n` reaches the threshold.
fn log_scaled(n: usize, threshold: u32) -> f64 {
    ((n as f64 + 1.0).ln() / (f64::from(threshold) + 1.0).ln()).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use touchflow_core::types::{EventType, Touchpoint};

    fn journey_of_length(n: usize) -> Journey {
        let base = Utc::now();
        let touchpoints = (0..n)
            .map(|i| Touchpoint {
                timestamp: base + chrono::Duration::hours(i as i64),
                channel: format!("ch{i}"),
                event_type: EventType::Click,
                customer_id: None,
                session_id: None,
                email: None,
                revenue: 0.0,
            })
            .collect();
        Journey::new(format!("j{n}"), touchpoints)
    }

    fn good_quality() -> DataQuality {
        DataQuality {
            completeness: 1.0,
            consistency: 1.0,
            freshness: 1.0,
        }
    }

    #[test]
    fn test_log_scaled_saturates_at_threshold() {
        assert_eq!(log_scaled(0, 100), 0.0);
        assert!(log_scaled(10, 100) < 1.0);
        assert_eq!(log_scaled(100, 100), 1.0);
        assert_eq!(log_scaled(5000, 100), 1.0);
    }

    #[test]
    fn test_overall_is_bounded_and_monotone_in_sample_size() {
        let scorer = ConfidenceScorer::default();
        let few: Vec<Journey> = (0..3).map(|_| journey_of_length(3)).collect();
        let many: Vec<Journey> = (0..200).map(|_| journey_of_length(3)).collect();

        let low = scorer.overall(&good_quality(), 0.9, ModelKind::Linear, &few);
        let high = scorer.overall(&good_quality(), 0.9, ModelKind::Linear, &many);
        assert!(low < high);
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
    }

    #[test]
    fn test_model_fit_fixed_for_non_parametric_models() {
        let scorer = ConfidenceScorer::default();
        let skewed: Vec<Journey> = (0..10).map(|_| journey_of_length(1)).collect();
        for kind in [ModelKind::FirstTouch, ModelKind::LastTouch, ModelKind::Linear] {
            assert_eq!(scorer.model_fit(kind, &skewed), BASELINE_MODEL_FIT);
        }
    }

    #[test]
    fn test_model_fit_discounts_parametric_models_on_skewed_data() {
        let scorer = ConfidenceScorer::default();
        let mut journeys: Vec<Journey> = (0..8).map(|_| journey_of_length(1)).collect();
        journeys.push(journey_of_length(4));
        journeys.push(journey_of_length(3));

        let fit = scorer.model_fit(ModelKind::TimeDecay, &journeys);
        assert!((fit - (0.9 - 0.4 * 0.8)).abs() < 1e-9);

        let balanced: Vec<Journey> = (0..10).map(|_| journey_of_length(4)).collect();
        assert_eq!(scorer.model_fit(ModelKind::PositionBased, &balanced), 0.9);
    }

    #[test]
    fn test_channel_confidence_discounts_thin_channels() {
        let scorer = ConfidenceScorer::default();
        let thin = scorer.channel_confidence(0.9, 1);
        let thick = scorer.channel_confidence(0.9, 50);
        assert!(thin < thick);
        assert!((thick - 0.9).abs() < 1e-9);
    }
}
