use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{ConfigurationError, IncompleteInputError};
use crate::models::{AssessmentSource, RawMetrics, RiskAssessment, StudentMetrics};
use crate::mood::{KeywordMoodClassifier, MoodClassifier};
use crate::normalize::normalize;
use crate::risk::{academic_risk, sentiment_risk, RiskAggregator};

/// Local scoring pipeline: normalize, sub-scores, aggregate.
///
/// Holds only immutable configuration, so a shared reference can score any
/// number of students concurrently.
#[derive(Debug, Clone)]
pub struct RiskEngine<C = KeywordMoodClassifier> {
    config: EngineConfig,
    aggregator: RiskAggregator,
    classifier: C,
}

impl RiskEngine<KeywordMoodClassifier> {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigurationError> {
        Self::with_classifier(config, KeywordMoodClassifier)
    }
}

impl<C: MoodClassifier> RiskEngine<C> {
    pub fn with_classifier(config: EngineConfig, classifier: C) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let aggregator = RiskAggregator::new(config.aggregate, config.tiers)?;
        Ok(Self {
            config,
            aggregator,
            classifier,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &RiskAggregator {
        &self.aggregator
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn normalize(&self, raw: &RawMetrics) -> Result<StudentMetrics, IncompleteInputError> {
        normalize(raw, &self.classifier)
    }

    pub fn score(&self, metrics: &StudentMetrics) -> RiskAssessment {
        let academic = academic_risk(
            metrics.attendance_pct,
            metrics.grade_pct,
            metrics.pending_assignments,
            &self.config.academic,
        );
        let sentiment = sentiment_risk(metrics.mood, &self.config.sentiment);
        let (risk_percentage, risk_level) = self.aggregator.aggregate(academic, sentiment);
        let crisis_flag = self.aggregator.is_crisis(risk_percentage);

        debug!(
            academic,
            sentiment,
            risk_percentage,
            level = risk_level.as_str(),
            crisis_flag,
            "scored student metrics"
        );

        RiskAssessment {
            academic_risk: academic,
            sentiment_risk: sentiment,
            risk_percentage,
            risk_level: risk_level.into(),
            crisis_flag,
            source: AssessmentSource::Local,
        }
    }

    pub fn assess(&self, raw: &RawMetrics) -> Result<RiskAssessment, IncompleteInputError> {
        let metrics = self.normalize(raw)?;
        Ok(self.score(&metrics))
    }
}
