use std::env;
use std::time::Duration;

use crate::error::ConfigurationError;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Blend of attendance and grades that feeds the academic sub-score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcademicWeights {
    pub attendance: f64,
    pub grade: f64,
    /// Added per pending assignment.
    pub pending_penalty: f64,
    pub pending_penalty_cap: f64,
}

impl Default for AcademicWeights {
    fn default() -> Self {
        Self {
            attendance: 0.5,
            grade: 0.5,
            pending_penalty: 2.0,
            pending_penalty_cap: 10.0,
        }
    }
}

/// Sentiment sub-score assigned to each mood category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentScale {
    pub good: f64,
    pub okay: f64,
    pub bad: f64,
    pub concern_threshold: f64,
}

impl Default for SentimentScale {
    fn default() -> Self {
        Self {
            good: 10.0,
            okay: 25.0,
            bad: 60.0,
            concern_threshold: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateWeights {
    pub academic: f64,
    pub sentiment: f64,
}

impl Default for AggregateWeights {
    fn default() -> Self {
        Self {
            academic: 0.8,
            sentiment: 0.2,
        }
    }
}

/// Inclusive upper bounds for LOW and MEDIUM; crisis is strictly above `crisis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierThresholds {
    pub low_max: u8,
    pub medium_max: u8,
    pub crisis: u8,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            low_max: 40,
            medium_max: 70,
            crisis: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineConfig {
    pub academic: AcademicWeights,
    pub sentiment: SentimentScale,
    pub aggregate: AggregateWeights,
    pub tiers: TierThresholds,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_pair(
            "academic input",
            ("attendance weight", self.academic.attendance),
            ("grade weight", self.academic.grade),
        )?;
        check_pair(
            "aggregate",
            ("academic weight", self.aggregate.academic),
            ("sentiment weight", self.aggregate.sentiment),
        )?;
        check_non_negative("pending penalty", self.academic.pending_penalty)?;
        check_range("pending penalty cap", self.academic.pending_penalty_cap)?;

        let scale = &self.sentiment;
        for (name, value) in [
            ("good mood score", scale.good),
            ("okay mood score", scale.okay),
            ("bad mood score", scale.bad),
            ("concern threshold", scale.concern_threshold),
        ] {
            check_range(name, value)?;
        }
        if !(scale.good < scale.okay && scale.okay < scale.bad) {
            return Err(ConfigurationError::SentimentOrder {
                good: scale.good,
                okay: scale.okay,
                bad: scale.bad,
            });
        }
        if scale.bad <= scale.concern_threshold {
            return Err(ConfigurationError::BelowConcern {
                bad: scale.bad,
                concern: scale.concern_threshold,
            });
        }

        let tiers = &self.tiers;
        if !(tiers.low_max < tiers.medium_max
            && tiers.medium_max <= tiers.crisis
            && tiers.crisis <= 100)
        {
            return Err(ConfigurationError::ThresholdOrder {
                low: tiers.low_max,
                medium: tiers.medium_max,
                crisis: tiers.crisis,
            });
        }

        Ok(())
    }

    /// Defaults overridden by any `RISK_WEIGHT_*` variables present.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let mut config = Self::default();
        if let Some(value) = env_f64("RISK_WEIGHT_ATTENDANCE")? {
            config.academic.attendance = value;
        }
        if let Some(value) = env_f64("RISK_WEIGHT_GRADE")? {
            config.academic.grade = value;
        }
        if let Some(value) = env_f64("RISK_WEIGHT_ACADEMIC")? {
            config.aggregate.academic = value;
        }
        if let Some(value) = env_f64("RISK_WEIGHT_SENTIMENT")? {
            config.aggregate.sentiment = value;
        }
        config.validate()?;
        Ok(config)
    }
}

fn check_pair(
    name: &'static str,
    first: (&'static str, f64),
    second: (&'static str, f64),
) -> Result<(), ConfigurationError> {
    check_non_negative(first.0, first.1)?;
    check_non_negative(second.0, second.1)?;
    let sum = first.1 + second.1;
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ConfigurationError::WeightSum { name, sum });
    }
    Ok(())
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigurationError::NegativeWeight { name, value });
    }
    Ok(())
}

fn check_range(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigurationError::OutOfRange { name, value });
    }
    Ok(())
}

fn env_f64(name: &'static str) -> Result<Option<f64>, ConfigurationError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigurationError::Unparseable { name, value }),
        Err(_) => Ok(None),
    }
}

/// Settings for the outbound prediction collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_millis(3000),
        }
    }
}

/// Top-level configuration for the CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub log_level: String,
    pub prediction: PredictionConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigurationError> {
        dotenvy::dotenv().ok();

        let timeout_ms = match env::var("PREDICT_TIMEOUT_MS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigurationError::Unparseable {
                    name: "PREDICT_TIMEOUT_MS",
                    value,
                })?,
            Err(_) => 3000,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            log_level: env::var("RISK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            prediction: PredictionConfig {
                base_url: env::var("PREDICT_URL").ok().filter(|url| !url.trim().is_empty()),
                timeout: Duration::from_millis(timeout_ms),
            },
            engine: EngineConfig::from_env()?,
        })
    }
}
