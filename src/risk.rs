use crate::config::{AcademicWeights, AggregateWeights, SentimentScale, TierThresholds};
use crate::error::ConfigurationError;
use crate::models::{MoodCategory, RiskLevel};

/// `100 - weighted_average(attendance, grade)` plus a capped penalty for
/// pending assignments, bounded to 0..=100.
pub fn academic_risk(
    attendance_pct: f64,
    grade_pct: f64,
    pending_assignments: u32,
    weights: &AcademicWeights,
) -> f64 {
    let engagement = attendance_pct * weights.attendance + grade_pct * weights.grade;
    let penalty = (f64::from(pending_assignments) * weights.pending_penalty)
        .min(weights.pending_penalty_cap);
    (100.0 - engagement + penalty).clamp(0.0, 100.0)
}

pub fn sentiment_risk(mood: MoodCategory, scale: &SentimentScale) -> f64 {
    match mood {
        MoodCategory::Good => scale.good,
        MoodCategory::Okay => scale.okay,
        MoodCategory::Bad => scale.bad,
    }
}

/// Combines sub-scores into a percentage and tier under validated weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAggregator {
    weights: AggregateWeights,
    tiers: TierThresholds,
}

impl RiskAggregator {
    pub fn new(weights: AggregateWeights, tiers: TierThresholds) -> Result<Self, ConfigurationError> {
        let config = crate::config::EngineConfig {
            aggregate: weights,
            tiers,
            ..Default::default()
        };
        config.validate()?;
        Ok(Self { weights, tiers })
    }

    pub fn aggregate(&self, academic_risk: f64, sentiment_risk: f64) -> (u8, RiskLevel) {
        let blended = academic_risk.clamp(0.0, 100.0) * self.weights.academic
            + sentiment_risk.clamp(0.0, 100.0) * self.weights.sentiment;
        let percentage = blended.round().clamp(0.0, 100.0) as u8;
        (percentage, self.classify(percentage))
    }

    pub fn classify(&self, risk_percentage: u8) -> RiskLevel {
        classify(risk_percentage, &self.tiers)
    }

    pub fn is_crisis(&self, risk_percentage: u8) -> bool {
        risk_percentage > self.tiers.crisis
    }
}

pub fn classify(risk_percentage: u8, tiers: &TierThresholds) -> RiskLevel {
    match risk_percentage {
        pct if pct <= tiers.low_max => RiskLevel::Low,
        pct if pct <= tiers.medium_max => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}
