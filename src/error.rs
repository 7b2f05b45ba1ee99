use std::time::Duration;

use thiserror::Error;

/// A required metric was absent from the submitted payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("incomplete input: missing {}", .missing.join(", "))]
pub struct IncompleteInputError {
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("{name} weights must sum to 1.0 (got {sum})")]
    WeightSum { name: &'static str, sum: f64 },
    #[error("{name} must not be negative (got {value})")]
    NegativeWeight { name: &'static str, value: f64 },
    #[error("{name} must be within 0..=100 (got {value})")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("sentiment scale must be ordered good < okay < bad (got {good}/{okay}/{bad})")]
    SentimentOrder { good: f64, okay: f64, bad: f64 },
    #[error("bad mood score {bad} must exceed the concern threshold {concern}")]
    BelowConcern { bad: f64, concern: f64 },
    #[error("tier thresholds must satisfy low < medium <= crisis (got {low}/{medium}/{crisis})")]
    ThresholdOrder { low: u8, medium: u8, crisis: u8 },
    #[error("{name} could not be parsed from '{value}'")]
    Unparseable { name: &'static str, value: String },
}

/// Why the remote prediction collaborator produced nothing usable.
#[derive(Debug, Error)]
pub enum PredictionUnavailable {
    #[error("prediction service disabled")]
    Disabled,
    #[error("prediction timed out after {0:?}")]
    Timeout(Duration),
    #[error("prediction request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("prediction service returned status {0}")]
    Status(u16),
    #[error("prediction response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown risk level '{value}'")]
pub struct UnknownRiskLevelError {
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_input_names_every_missing_field() {
        let err = IncompleteInputError {
            missing: vec!["grade_pct", "mood_signal"],
        };
        assert_eq!(
            err.to_string(),
            "incomplete input: missing grade_pct, mood_signal"
        );
    }
}
