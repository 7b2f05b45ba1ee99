use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownRiskLevelError;

/// Metrics as they arrive from a form, CSV row or API payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMetrics {
    pub attendance_pct: Option<f64>,
    pub grade_pct: Option<f64>,
    pub pending_assignments: Option<f64>,
    pub mood_signal: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodCategory {
    Good,
    Okay,
    Bad,
}

impl MoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodCategory::Good => "good",
            MoodCategory::Okay => "okay",
            MoodCategory::Bad => "bad",
        }
    }

    /// Matches the fixed categorical tokens only; free text returns `None`.
    pub fn from_token(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "good" => Some(Self::Good),
            "okay" => Some(Self::Okay),
            "bad" => Some(Self::Bad),
            _ => None,
        }
    }
}

/// Validated, clamped metrics ready for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentMetrics {
    pub attendance_pct: f64,
    pub grade_pct: f64,
    pub pending_assignments: u32,
    pub mood: MoodCategory,
    /// The mood text as submitted, kept for the outbound prediction call.
    pub mood_text: String,
    pub crisis_language: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownRiskLevelError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(UnknownRiskLevelError {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A risk level as stored or received, which may predate or escape the enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordedLevel {
    Known(RiskLevel),
    Unknown(String),
}

impl RecordedLevel {
    pub fn known(&self) -> Option<RiskLevel> {
        match self {
            RecordedLevel::Known(level) => Some(*level),
            RecordedLevel::Unknown(_) => None,
        }
    }
}

impl From<RiskLevel> for RecordedLevel {
    fn from(value: RiskLevel) -> Self {
        Self::Known(value)
    }
}

impl From<String> for RecordedLevel {
    fn from(value: String) -> Self {
        match RiskLevel::parse(&value) {
            Ok(level) => Self::Known(level),
            Err(_) => Self::Unknown(value),
        }
    }
}

impl From<RecordedLevel> for String {
    fn from(value: RecordedLevel) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RecordedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordedLevel::Known(level) => f.write_str(level.as_str()),
            RecordedLevel::Unknown(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentSource {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub academic_risk: f64,
    pub sentiment_risk: f64,
    pub risk_percentage: u8,
    pub risk_level: RecordedLevel,
    pub crisis_flag: bool,
    pub source: AssessmentSource,
}

/// Shape returned by the external prediction service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemotePrediction {
    pub risk_percentage: f64,
    pub risk_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Identity supplied when a student is admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub cohort: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub cohort: String,
    pub metrics: StudentMetrics,
    pub assessment: RiskAssessment,
    notes: Vec<Note>,
}

impl StudentRecord {
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        email: impl Into<String>,
        cohort: impl Into<String>,
        metrics: StudentMetrics,
        assessment: RiskAssessment,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            cohort: cohort.into(),
            metrics,
            assessment,
            notes: Vec::new(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn append_note(&mut self, body: impl Into<String>, created_at: DateTime<Utc>) {
        self.notes.push(Note {
            body: body.into(),
            created_at,
        });
    }

    /// Replaces metrics and assessment together; notes are untouched.
    pub fn resubmit(&mut self, metrics: StudentMetrics, assessment: RiskAssessment) {
        self.metrics = metrics;
        self.assessment = assessment;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PopulationSummary {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub unknown: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_level_keeps_unrecognized_values() {
        assert_eq!(
            RecordedLevel::from("medium".to_string()),
            RecordedLevel::Known(RiskLevel::Medium)
        );
        assert_eq!(
            RecordedLevel::from("SEVERE".to_string()),
            RecordedLevel::Unknown("SEVERE".to_string())
        );
    }

    #[test]
    fn resubmitting_metrics_keeps_notes() {
        let metrics = StudentMetrics {
            attendance_pct: 90.0,
            grade_pct: 88.0,
            pending_assignments: 0,
            mood: MoodCategory::Good,
            mood_text: "good".to_string(),
            crisis_language: false,
        };
        let assessment = RiskAssessment {
            academic_risk: 11.0,
            sentiment_risk: 10.0,
            risk_percentage: 11,
            risk_level: RiskLevel::Low.into(),
            crisis_flag: false,
            source: AssessmentSource::Local,
        };
        let mut record = StudentRecord::new(
            Uuid::new_v4(),
            "Avery Lee",
            "avery@example.com",
            "2026",
            metrics.clone(),
            assessment.clone(),
        );
        record.append_note("Met with advisor", Utc::now());

        let worse = RiskAssessment {
            risk_percentage: 55,
            risk_level: RiskLevel::Medium.into(),
            ..assessment
        };
        record.resubmit(metrics, worse);
        record.append_note("Follow-up booked", Utc::now());

        assert_eq!(record.assessment.risk_percentage, 55);
        let bodies: Vec<&str> = record.notes().iter().map(|note| note.body.as_str()).collect();
        assert_eq!(bodies, vec!["Met with advisor", "Follow-up booked"]);
    }

    #[test]
    fn mood_tokens_ignore_case_and_padding() {
        assert_eq!(MoodCategory::from_token(" Good "), Some(MoodCategory::Good));
        assert_eq!(MoodCategory::from_token("fine"), None);
    }
}
