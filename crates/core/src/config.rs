use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `TOUCHFLOW__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub attribution: AttributionConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

/// Defaults for the attribution request parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributionConfig {
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_half_life_days")]
    pub time_decay_half_life_days: f64,
    #[serde(default = "default_first_touch_weight")]
    pub position_first_touch_weight: f64,
    #[serde(default = "default_last_touch_weight")]
    pub position_last_touch_weight: f64,
}

/// Thresholds for data-quality scoring and warnings.
#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    /// Days after which freshness decays to zero.
    #[serde(default = "default_freshness_horizon_days")]
    pub freshness_horizon_days: u32,
    /// Journey count at which the sample-size factor saturates.
    #[serde(default = "default_sample_size_threshold")]
    pub sample_size_threshold: u32,
    /// Per-channel journey count at which the channel discount saturates.
    #[serde(default = "default_channel_sample_threshold")]
    pub channel_sample_threshold: u32,
    /// Completeness below this adds a data-quality warning.
    #[serde(default = "default_min_completeness")]
    pub min_completeness: f64,
    /// Consistency below this adds a data-quality warning.
    #[serde(default = "default_min_consistency")]
    pub min_consistency: f64,
}

// Default functions
fn default_window_days() -> u32 {
    30
}
fn default_confidence_threshold() -> f64 {
    0.7
}
fn default_half_life_days() -> f64 {
    7.0
}
fn default_first_touch_weight() -> f64 {
    0.4
}
fn default_last_touch_weight() -> f64 {
    0.4
}
fn default_freshness_horizon_days() -> u32 {
    90
}
fn default_sample_size_threshold() -> u32 {
    100
}
fn default_channel_sample_threshold() -> u32 {
    10
}
fn default_min_completeness() -> f64 {
    0.8
}
fn default_min_consistency() -> f64 {
    0.7
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
            confidence_threshold: default_confidence_threshold(),
            time_decay_half_life_days: default_half_life_days(),
            position_first_touch_weight: default_first_touch_weight(),
            position_last_touch_weight: default_last_touch_weight(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            freshness_horizon_days: default_freshness_horizon_days(),
            sample_size_threshold: default_sample_size_threshold(),
            channel_sample_threshold: default_channel_sample_threshold(),
            min_completeness: default_min_completeness(),
            min_consistency: default_min_consistency(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            attribution: AttributionConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("TOUCHFLOW")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.attribution.default_window_days, 30);
        assert_eq!(config.attribution.confidence_threshold, 0.7);
        assert_eq!(config.attribution.time_decay_half_life_days, 7.0);
        assert_eq!(config.attribution.position_first_touch_weight, 0.4);
        assert_eq!(config.attribution.position_last_touch_weight, 0.4);
        assert_eq!(config.quality.freshness_horizon_days, 90);
        assert_eq!(config.quality.sample_size_threshold, 100);
        assert_eq!(config.quality.min_completeness, 0.8);
    }
}
