//! The attribution service — orchestrates one complete analysis call.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use touchflow_confidence::{ConfidenceScorer, DataQualityAnalyzer};
use touchflow_core::config::AppConfig;
use touchflow_core::error::AttributionError;
use touchflow_core::table::TouchpointTable;
use touchflow_core::types::{
    AnalysisMetadata, AttributionResult, AttributionSummary, ChannelAttribution, Journey,
    LinkingMethod,
};
use touchflow_core::CoreResult;
use touchflow_identity::IdentityResolver;
use touchflow_models::ModelSpec;
use tracing::info;

use crate::insights::JourneyAnalyzer;

/// Parameters for one analysis call. Defaults mirror `AppConfig`.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub model: ModelSpec,
    pub linking_method: LinkingMethod,
    pub attribution_window_days: u32,
    pub confidence_threshold: f64,
    pub include_journey_analysis: bool,
}

impl AnalysisRequest {
    pub fn new(model: ModelSpec) -> Self {
        Self::from_config(model, &AppConfig::default())
    }

    pub fn from_config(model: ModelSpec, config: &AppConfig) -> Self {
        Self {
            model,
            linking_method: LinkingMethod::Auto,
            attribution_window_days: config.attribution.default_window_days,
            confidence_threshold: config.attribution.confidence_threshold,
            include_journey_analysis: true,
        }
    }
}

/// Stateless analysis entry point. Each call is a pure function of
/// (table, request, now); concurrent calls share nothing mutable.
#[derive(Debug, Clone)]
pub struct AttributionService {
    quality_analyzer: DataQualityAnalyzer,
    scorer: ConfidenceScorer,
    min_completeness: f64,
    min_consistency: f64,
}

impl Default for AttributionService {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AttributionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            quality_analyzer: DataQualityAnalyzer::new(config.quality.freshness_horizon_days),
            scorer: ConfidenceScorer::new(
                config.quality.sample_size_threshold,
                config.quality.channel_sample_threshold,
            ),
            min_completeness: config.quality.min_completeness,
            min_consistency: config.quality.min_consistency,
        }
    }

    /// Run a full attribution analysis with the current wall clock driving
    /// the freshness component.
    pub fn analyze(
        &self,
        table: &TouchpointTable,
        request: &AnalysisRequest,
    ) -> CoreResult<AttributionResult> {
        self.analyze_at(table, request, Utc::now())
    }

    /// Run a full attribution analysis with an explicit `now`, so results
    /// are reproducible byte-for-byte.
    pub fn analyze_at(
        &self,
        table: &TouchpointTable,
        request: &AnalysisRequest,
        now: DateTime<Utc>,
    ) -> CoreResult<AttributionResult> {
        // Fail fast on bad parameters before touching any journey.
        let model = request.model.build()?;
        if !(1..=365).contains(&request.attribution_window_days) {
            return Err(AttributionError::InvalidParameter(format!(
                "attribution window must be within [1, 365] days, got {}",
                request.attribution_window_days
            )));
        }
        if !(0.0..=1.0).contains(&request.confidence_threshold) {
            return Err(AttributionError::InvalidParameter(format!(
                "confidence threshold must be within [0, 1], got {}",
                request.confidence_threshold
            )));
        }
        if table.is_empty() {
            return Err(AttributionError::InsufficientData(
                "touchpoint table is empty".to_string(),
            ));
        }

        let quality = self.quality_analyzer.assess(table, now);
        let resolver = IdentityResolver::new(request.attribution_window_days);
        let resolution = resolver.resolve(table, request.linking_method)?;
        let mut warnings = resolution.warnings.clone();

        let converting: Vec<&Journey> =
            resolution.journeys.iter().filter(|j| j.converted).collect();
        if converting.is_empty() {
            warnings.push("no converting journeys found in the dataset".to_string());
        }

        // Only converting journeys earn credit; attribution answers
        // "what drove this conversion".
        let mut credit_sums: BTreeMap<String, f64> = BTreeMap::new();
        let mut revenue_sums: BTreeMap<String, f64> = BTreeMap::new();
        let mut conversion_counts: BTreeMap<String, u64> = BTreeMap::new();
        for journey in &converting {
            for (channel, credit) in model.calculate(journey) {
                if credit > 0.0 {
                    *conversion_counts.entry(channel.clone()).or_insert(0) += 1;
                }
                *revenue_sums.entry(channel.clone()).or_insert(0.0) +=
                    journey.total_revenue * credit;
                *credit_sums.entry(channel).or_insert(0.0) += credit;
            }
        }

        if quality.completeness < self.min_completeness {
            warnings.push(format!(
                "data completeness {:.2} is below the recommended {:.2}",
                quality.completeness, self.min_completeness
            ));
        }
        if quality.consistency < self.min_consistency {
            warnings.push(format!(
                "data consistency {:.2} is below the recommended {:.2}",
                quality.consistency, self.min_consistency
            ));
        }

        let overall_confidence = self.scorer.overall(
            &quality,
            resolution.confidence,
            model.kind(),
            &resolution.journeys,
        );
        if overall_confidence < request.confidence_threshold {
            warnings.push(format!(
                "overall confidence {:.2} is below the requested threshold {:.2}",
                overall_confidence, request.confidence_threshold
            ));
        }

        // Per-journey credits each sum to 1.0, so dividing the summed
        // credit by the converting-journey count renormalizes the final
        // split to 1.0 across channels.
        let converting_count = converting.len();
        let channel_attribution: BTreeMap<String, ChannelAttribution> = credit_sums
            .into_iter()
            .map(|(channel, credit_sum)| {
                let conversions = conversion_counts.get(&channel).copied().unwrap_or(0);
                let attribution = ChannelAttribution {
                    credit: credit_sum / converting_count as f64,
                    conversions,
                    revenue: revenue_sums.get(&channel).copied().unwrap_or(0.0),
                    confidence: self
                        .scorer
                        .channel_confidence(overall_confidence, conversions as usize),
                };
                (channel, attribution)
            })
            .collect();

        let journey_count = resolution.journeys.len();
        let average_journey_length = if journey_count > 0 {
            resolution.journeys.iter().map(Journey::len).sum::<usize>() as f64
                / journey_count as f64
        } else {
            0.0
        };
        let summary = AttributionSummary {
            total_conversions: converting_count as u64,
            total_revenue: converting.iter().map(|j| j.total_revenue).sum(),
            average_journey_length,
            unique_customers: journey_count as u64,
            attribution_window_days: request.attribution_window_days,
        };

        let timestamps: Vec<DateTime<Utc>> = table
            .records()
            .iter()
            .filter_map(|r| r.parse_timestamp())
            .collect();
        let metadata = AnalysisMetadata {
            model_used: model.kind(),
            linking_method: resolution.method_used,
            confidence_score: overall_confidence,
            data_quality: quality,
            records_analyzed: (table.len() - resolution.records_dropped) as u64,
            records_dropped: resolution.records_dropped as u64,
            time_range_start: timestamps.iter().min().copied(),
            time_range_end: timestamps.iter().max().copied(),
            warnings,
        };

        let journey_analysis = request
            .include_journey_analysis
            .then(|| JourneyAnalyzer::analyze(&resolution.journeys));

        info!(
            model = ?metadata.model_used,
            linking_method = ?metadata.linking_method,
            journeys = journey_count,
            conversions = summary.total_conversions,
            channels = channel_attribution.len(),
            confidence = overall_confidence,
            "attribution analysis complete"
        );

        Ok(AttributionResult {
            channel_attribution,
            summary,
            journey_analysis,
            metadata,
        })
    }
}
