use std::collections::HashMap;
use std::io;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::RiskEngine;
use crate::models::{
    AssessmentSource, MoodCategory, NewStudent, RawMetrics, RecordedLevel, RiskAssessment,
    StudentMetrics, StudentRecord,
};
use crate::mood::MoodClassifier;
use crate::prediction::PredictionSource;
use crate::reconcile::admit_student;

const STUDENT_COLUMNS: &str = "id, full_name, email, cohort, attendance_pct, grade_pct, \
     pending_assignments, mood, mood_text, crisis_language, academic_risk, sentiment_risk, \
     risk_percentage, risk_level, crisis_flag, source";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed<C: MoodClassifier>(pool: &PgPool, engine: &RiskEngine<C>) -> anyhow::Result<()> {
    let students = vec![
        (
            "Avery Lee",
            "avery.lee@example.edu",
            "2026",
            (92.0, 85.0, 1.0, "good"),
        ),
        (
            "Jules Moreno",
            "jules.moreno@example.edu",
            "2025",
            (68.0, 61.0, 4.0, "Concerned about recent grade drops"),
        ),
        (
            "Kiara Patel",
            "kiara.patel@example.edu",
            "2026",
            (41.0, 38.0, 9.0, "I feel hopeless and can't continue anymore"),
        ),
    ];

    for (name, email, cohort, (attendance, grades, pending, mood)) in students {
        let raw = RawMetrics {
            attendance_pct: Some(attendance),
            grade_pct: Some(grades),
            pending_assignments: Some(pending),
            mood_signal: Some(mood.to_string()),
        };
        let metrics = engine.normalize(&raw)?;
        let assessment = engine.score(&metrics);
        let record = StudentRecord::new(Uuid::new_v4(), name, email, cohort, metrics, assessment);
        upsert_student(pool, &record).await?;
    }

    Ok(())
}

/// Inserts a student or replaces the latest metrics and assessment of an
/// existing one (matched by email). Notes are never touched.
pub async fn upsert_student(pool: &PgPool, record: &StudentRecord) -> anyhow::Result<Uuid> {
    let metrics = &record.metrics;
    let assessment = &record.assessment;

    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO student_risk.students
        (id, full_name, email, cohort, attendance_pct, grade_pct, pending_assignments,
         mood, mood_text, crisis_language, academic_risk, sentiment_risk,
         risk_percentage, risk_level, crisis_flag, source, assessed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, now())
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            cohort = EXCLUDED.cohort,
            attendance_pct = EXCLUDED.attendance_pct,
            grade_pct = EXCLUDED.grade_pct,
            pending_assignments = EXCLUDED.pending_assignments,
            mood = EXCLUDED.mood,
            mood_text = EXCLUDED.mood_text,
            crisis_language = EXCLUDED.crisis_language,
            academic_risk = EXCLUDED.academic_risk,
            sentiment_risk = EXCLUDED.sentiment_risk,
            risk_percentage = EXCLUDED.risk_percentage,
            risk_level = EXCLUDED.risk_level,
            crisis_flag = EXCLUDED.crisis_flag,
            source = EXCLUDED.source,
            assessed_at = now()
        RETURNING id
        "#,
    )
    .bind(record.id)
    .bind(&record.name)
    .bind(&record.email)
    .bind(&record.cohort)
    .bind(metrics.attendance_pct)
    .bind(metrics.grade_pct)
    .bind(i32::try_from(metrics.pending_assignments).unwrap_or(i32::MAX))
    .bind(metrics.mood.as_str())
    .bind(&metrics.mood_text)
    .bind(metrics.crisis_language)
    .bind(assessment.academic_risk)
    .bind(assessment.sentiment_risk)
    .bind(i16::from(assessment.risk_percentage))
    .bind(assessment.risk_level.to_string())
    .bind(assessment.crisis_flag)
    .bind(source_label(assessment.source))
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

/// Stores a newly admitted record together with the notes it carries.
pub async fn save_admission(pool: &PgPool, record: &StudentRecord) -> anyhow::Result<Uuid> {
    let student_id = upsert_student(pool, record).await?;
    for note in record.notes() {
        insert_note(pool, student_id, &note.body, note.created_at).await?;
    }
    Ok(student_id)
}

fn source_label(source: AssessmentSource) -> &'static str {
    match source {
        AssessmentSource::Local => "local",
        AssessmentSource::Remote => "remote",
    }
}

/// Recovers the mood category of a stored row. A value outside the fixed
/// tokens is logged and re-derived from the stored mood text.
fn stored_mood<C: MoodClassifier + ?Sized>(
    id: Uuid,
    stored: &str,
    mood_text: &str,
    classifier: &C,
) -> MoodCategory {
    MoodCategory::from_token(stored).unwrap_or_else(|| {
        let recovered =
            MoodCategory::from_token(mood_text).unwrap_or_else(|| classifier.classify(mood_text));
        warn!(
            student = %id,
            stored,
            recovered = recovered.as_str(),
            "invalid stored mood, reclassified from mood text"
        );
        recovered
    })
}

fn record_from_row<C: MoodClassifier + ?Sized>(row: &PgRow, classifier: &C) -> StudentRecord {
    let id: Uuid = row.get("id");
    let mood_text: String = row.get("mood_text");
    let mood = stored_mood(id, &row.get::<String, _>("mood"), &mood_text, classifier);
    let source: String = row.get("source");
    let risk_percentage: i16 = row.get("risk_percentage");
    let pending: i32 = row.get("pending_assignments");

    let metrics = StudentMetrics {
        attendance_pct: row.get("attendance_pct"),
        grade_pct: row.get("grade_pct"),
        pending_assignments: u32::try_from(pending).unwrap_or(0),
        mood,
        mood_text,
        crisis_language: row.get("crisis_language"),
    };
    let assessment = RiskAssessment {
        academic_risk: row.get("academic_risk"),
        sentiment_risk: row.get("sentiment_risk"),
        risk_percentage: risk_percentage.clamp(0, 100) as u8,
        risk_level: RecordedLevel::from(row.get::<String, _>("risk_level")),
        crisis_flag: row.get("crisis_flag"),
        source: if source == "remote" {
            AssessmentSource::Remote
        } else {
            AssessmentSource::Local
        },
    };

    StudentRecord::new(
        id,
        row.get::<String, _>("full_name"),
        row.get::<String, _>("email"),
        row.get::<String, _>("cohort"),
        metrics,
        assessment,
    )
}

pub async fn fetch_records<C: MoodClassifier + ?Sized>(
    pool: &PgPool,
    classifier: &C,
    cohort: Option<&str>,
) -> anyhow::Result<Vec<StudentRecord>> {
    let mut query = format!("SELECT {STUDENT_COLUMNS} FROM student_risk.students");
    if cohort.is_some() {
        query.push_str(" WHERE cohort = $1");
    }
    query.push_str(" ORDER BY full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    }

    let mut records: Vec<StudentRecord> = rows
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| record_from_row(row, classifier))
        .collect();

    attach_notes(pool, &mut records).await?;
    Ok(records)
}

/// Loads one student, notes included.
pub async fn fetch_record<C: MoodClassifier + ?Sized>(
    pool: &PgPool,
    classifier: &C,
    email: &str,
) -> anyhow::Result<Option<StudentRecord>> {
    let query = format!("SELECT {STUDENT_COLUMNS} FROM student_risk.students WHERE email = $1");
    let Some(row) = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let mut records = vec![record_from_row(&row, classifier)];
    attach_notes(pool, &mut records).await?;
    Ok(records.pop())
}

async fn attach_notes(pool: &PgPool, records: &mut [StudentRecord]) -> anyhow::Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = records.iter().map(|record| record.id).collect();
    let rows = sqlx::query(
        "SELECT student_id, body, created_at FROM student_risk.student_notes \
         WHERE student_id = ANY($1) ORDER BY created_at",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_student: HashMap<Uuid, Vec<(String, DateTime<Utc>)>> = HashMap::new();
    for row in rows {
        by_student
            .entry(row.get("student_id"))
            .or_default()
            .push((row.get("body"), row.get("created_at")));
    }

    for record in records.iter_mut() {
        if let Some(notes) = by_student.remove(&record.id) {
            for (body, created_at) in notes {
                record.append_note(body, created_at);
            }
        }
    }
    Ok(())
}

async fn student_id(pool: &PgPool, email: &str) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query("SELECT id FROM student_risk.students WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("id")))
}

async fn insert_note(
    pool: &PgPool,
    student_id: Uuid,
    body: &str,
    created_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO student_risk.student_notes (id, student_id, body, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(body)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Appends a note; existing notes are never updated or removed.
pub async fn append_note(
    pool: &PgPool,
    email: &str,
    body: &str,
    created_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    let student_id = student_id(pool, email)
        .await?
        .with_context(|| format!("no student with email {email}"))?;
    insert_note(pool, student_id, body, created_at).await
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    full_name: String,
    email: String,
    cohort: String,
    attendance: Option<f64>,
    grades: Option<f64>,
    assignments: Option<f64>,
    mood: Option<String>,
}

/// A CSV row that decoded cleanly, with its line in the source file.
#[derive(Debug, Clone)]
pub struct CsvAdmission {
    pub line: u64,
    pub student: NewStudent,
    pub raw: RawMetrics,
}

/// A CSV row left out of an import and the reason it was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub line: u64,
    pub email: Option<String>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub rows: Vec<CsvAdmission>,
    pub rejected: Vec<Rejection>,
}

/// Decodes admission rows. A malformed row becomes a [`Rejection`] and
/// decoding carries on; only an unreadable header fails the whole file.
pub fn parse_csv<R: io::Read>(input: R) -> Result<ParsedCsv, csv::Error> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let email_column = headers.iter().position(|header| header == "email");
    let mut parsed = ParsedCsv::default();

    for (index, result) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map_or(fallback_line, |pos| pos.line());
                warn!(line, error = %err, "skipping unreadable row");
                parsed.rejected.push(Rejection {
                    line,
                    email: None,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let line = record.position().map_or(fallback_line, |pos| pos.line());
        match record.deserialize::<CsvRow>(Some(&headers)) {
            Ok(row) => parsed.rows.push(CsvAdmission {
                line,
                student: NewStudent {
                    name: row.full_name,
                    email: row.email,
                    cohort: row.cohort,
                },
                raw: RawMetrics {
                    attendance_pct: row.attendance,
                    grade_pct: row.grades,
                    pending_assignments: row.assignments,
                    mood_signal: row.mood,
                },
            }),
            Err(err) => {
                let email = email_column
                    .and_then(|column| record.get(column))
                    .map(str::to_string);
                warn!(line, email = email.as_deref(), error = %err, "skipping malformed row");
                parsed.rejected.push(Rejection {
                    line,
                    email,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(parsed)
}

/// Scores decoded rows into records. Rows with missing metrics are
/// rejected, never defaulted.
pub async fn admit_rows<C, P>(
    engine: &RiskEngine<C>,
    source: &P,
    rows: Vec<CsvAdmission>,
    admitted_at: DateTime<Utc>,
) -> (Vec<StudentRecord>, Vec<Rejection>)
where
    C: MoodClassifier,
    P: PredictionSource,
{
    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for row in rows {
        let email = row.student.email.clone();
        match admit_student(engine, source, row.student, &row.raw, None, admitted_at).await {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(line = row.line, email = %email, error = %err, "skipping incomplete row");
                rejected.push(Rejection {
                    line: row.line,
                    email: Some(email),
                    reason: err.to_string(),
                });
            }
        }
    }

    (records, rejected)
}

/// Bulk admission. Each row is scored on the way in; bad rows are reported
/// and the rest of the file is still imported.
pub async fn import_csv<C, P>(
    pool: &PgPool,
    engine: &RiskEngine<C>,
    source: &P,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportOutcome>
where
    C: MoodClassifier,
    P: PredictionSource,
{
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let parsed =
        parse_csv(file).with_context(|| format!("failed to read {}", csv_path.display()))?;

    let (records, mut rejected) = admit_rows(engine, source, parsed.rows, Utc::now()).await;
    rejected.extend(parsed.rejected);
    rejected.sort_by_key(|rejection| rejection.line);

    for record in &records {
        save_admission(pool, record).await?;
    }

    let outcome = ImportOutcome {
        imported: records.len(),
        rejected,
    };
    info!(
        imported = outcome.imported,
        rejected = outcome.rejected.len(),
        "csv import finished"
    );
    Ok(outcome)
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub imported: usize,
    pub rejected: Vec<Rejection>,
}
