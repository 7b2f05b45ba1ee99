use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::RiskEngine;
use crate::error::IncompleteInputError;
use crate::intervention::{level_to_intervention, Intervention};
use crate::models::{
    AssessmentSource, NewStudent, PopulationSummary, RawMetrics, RecordedLevel, RemotePrediction,
    RiskAssessment, RiskLevel, StudentMetrics, StudentRecord,
};
use crate::mood::MoodClassifier;
use crate::prediction::PredictionSource;
use crate::risk::RiskAggregator;

/// Chooses between the local estimate and the remote prediction.
///
/// A remote result replaces the percentage and level; the sub-scores stay
/// local because the service does not report them, and the crisis flag is
/// re-derived from the remote percentage.
pub fn reconcile(
    local: RiskAssessment,
    remote: Option<&RemotePrediction>,
    aggregator: &RiskAggregator,
) -> RiskAssessment {
    let Some(remote) = remote else {
        return local;
    };

    let risk_percentage = remote.risk_percentage.round().clamp(0.0, 100.0) as u8;
    let risk_level = match RiskLevel::parse(&remote.risk_level) {
        Ok(level) => RecordedLevel::Known(level),
        Err(err) => {
            warn!(error = %err, risk_percentage, "prediction service returned an unknown risk level");
            RecordedLevel::Unknown(err.value)
        }
    };

    RiskAssessment {
        risk_percentage,
        risk_level,
        crisis_flag: aggregator.is_crisis(risk_percentage),
        source: AssessmentSource::Remote,
        ..local
    }
}

/// Scores locally, asks the prediction source, and reconciles. Collaborator
/// failures fall back to the local assessment; only bad input is an error.
pub async fn assess_with_fallback<C, P>(
    engine: &RiskEngine<C>,
    source: &P,
    raw: &RawMetrics,
) -> Result<(StudentMetrics, RiskAssessment), IncompleteInputError>
where
    C: MoodClassifier,
    P: PredictionSource,
{
    let metrics = engine.normalize(raw)?;
    let local = engine.score(&metrics);
    let remote = match source.predict(&metrics).await {
        Ok(prediction) => Some(prediction),
        Err(err) => {
            warn!(error = %err, "prediction unavailable, using local estimate");
            None
        }
    };
    let assessment = reconcile(local, remote.as_ref(), engine.aggregator());
    Ok((metrics, assessment))
}

/// Creates the record for a manually added or imported student, scored on
/// the way in. A blank first note is dropped.
pub async fn admit_student<C, P>(
    engine: &RiskEngine<C>,
    source: &P,
    student: NewStudent,
    raw: &RawMetrics,
    first_note: Option<&str>,
    admitted_at: DateTime<Utc>,
) -> Result<StudentRecord, IncompleteInputError>
where
    C: MoodClassifier,
    P: PredictionSource,
{
    let (metrics, assessment) = assess_with_fallback(engine, source, raw).await?;
    let mut record = StudentRecord::new(
        Uuid::new_v4(),
        student.name,
        student.email,
        student.cohort,
        metrics,
        assessment,
    );
    if let Some(body) = first_note.map(str::trim).filter(|body| !body.is_empty()) {
        record.append_note(body, admitted_at);
    }

    info!(student = %record.id, level = %record.assessment.risk_level, "student admitted");
    Ok(record)
}

/// Scores newly submitted metrics and replaces the record's latest ones.
/// On incomplete input the record is left untouched.
pub async fn rescore_record<C, P>(
    engine: &RiskEngine<C>,
    source: &P,
    record: &mut StudentRecord,
    raw: &RawMetrics,
) -> Result<(), IncompleteInputError>
where
    C: MoodClassifier,
    P: PredictionSource,
{
    let (metrics, assessment) = assess_with_fallback(engine, source, raw).await?;
    record.resubmit(metrics, assessment);
    Ok(())
}

/// Counts records per tier. Levels outside the enum go to `unknown`.
pub fn summarize(records: &[StudentRecord]) -> PopulationSummary {
    let mut summary = PopulationSummary {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        match &record.assessment.risk_level {
            RecordedLevel::Known(RiskLevel::Low) => summary.low += 1,
            RecordedLevel::Known(RiskLevel::Medium) => summary.medium += 1,
            RecordedLevel::Known(RiskLevel::High) => summary.high += 1,
            RecordedLevel::Unknown(value) => {
                warn!(student = %record.id, level = %value, "record carries an unknown risk level");
                summary.unknown += 1;
            }
        }
    }

    info!(
        total = summary.total,
        high = summary.high,
        unknown = summary.unknown,
        "population summarized"
    );
    summary
}

#[derive(Debug, Clone)]
pub struct Alert<'a> {
    pub record: &'a StudentRecord,
    pub intervention: Intervention,
    pub crisis: bool,
}

/// Records flagged as crisis or HIGH, most severe first.
pub fn alerts(records: &[StudentRecord]) -> Vec<Alert<'_>> {
    let mut alerts: Vec<Alert<'_>> = records
        .iter()
        .filter(|record| {
            record.assessment.crisis_flag
                || record.metrics.crisis_language
                || record.assessment.risk_level.known() == Some(RiskLevel::High)
        })
        .map(|record| Alert {
            record,
            intervention: level_to_intervention(
                record.assessment.risk_level.known().unwrap_or(RiskLevel::High),
            ),
            crisis: record.assessment.crisis_flag || record.metrics.crisis_language,
        })
        .collect();

    alerts.sort_by(|a, b| {
        b.crisis.cmp(&a.crisis).then(
            b.record
                .assessment
                .risk_percentage
                .cmp(&a.record.assessment.risk_percentage),
        )
    });
    alerts
}
