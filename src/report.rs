use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::intervention;
use crate::models::{Note, StudentRecord};
use crate::reconcile;

fn recent_notes(records: &[StudentRecord], limit: usize) -> Vec<(&StudentRecord, &Note)> {
    let mut notes: Vec<(&StudentRecord, &Note)> = records
        .iter()
        .flat_map(|record| record.notes().iter().map(move |note| (record, note)))
        .collect();
    notes.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
    notes.truncate(limit);
    notes
}

pub fn build_report(
    cohort: Option<&str>,
    generated_at: DateTime<Utc>,
    records: &[StudentRecord],
) -> String {
    let summary = reconcile::summarize(records);
    let alerts = reconcile::alerts(records);

    let mut output = String::new();
    let cohort_label = cohort.unwrap_or("all cohorts");

    let _ = writeln!(output, "# Student Risk Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        cohort_label,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Distribution");

    if summary.total == 0 {
        let _ = writeln!(output, "No students recorded.");
    } else {
        let _ = writeln!(output, "- HIGH: {}", summary.high);
        let _ = writeln!(output, "- MEDIUM: {}", summary.medium);
        let _ = writeln!(output, "- LOW: {}", summary.low);
        if summary.unknown > 0 {
            let _ = writeln!(output, "- unknown: {}", summary.unknown);
        }
        let _ = writeln!(output, "- total: {}", summary.total);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alerts");

    if alerts.is_empty() {
        let _ = writeln!(output, "No students need urgent attention.");
    } else {
        for alert in alerts.iter().take(10) {
            let record = alert.record;
            let _ = writeln!(
                output,
                "- {}{} ({}, {}) risk {}% {}: {}",
                if alert.crisis { "[CRISIS] " } else { "" },
                record.name,
                record.email,
                record.cohort,
                record.assessment.risk_percentage,
                record.assessment.risk_level,
                alert.intervention.title
            );
        }
    }

    let mut ranked: Vec<&StudentRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        b.assessment
            .risk_percentage
            .cmp(&a.assessment.risk_percentage)
    });
    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");

    if ranked.is_empty() {
        let _ = writeln!(output, "No students recorded.");
    } else {
        for record in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) risk {}% (academic {:.1}, sentiment {:.1}, mood {})",
                record.name,
                record.cohort,
                record.assessment.risk_percentage,
                record.assessment.academic_risk,
                record.assessment.sentiment_risk,
                record.metrics.mood.as_str()
            );
        }
    }

    let notes = recent_notes(records, 5);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Notes");

    if notes.is_empty() {
        let _ = writeln!(output, "No notes recorded.");
    } else {
        for (record, note) in notes {
            let _ = writeln!(
                output,
                "- {} on {}: {}",
                record.name,
                note.created_at.date_naive(),
                note.body
            );
        }
    }

    output
}

/// Single-student profile: metrics, sub-scores, crisis state, the
/// recommended intervention and the full note history.
pub fn build_profile(record: &StudentRecord) -> String {
    let metrics = &record.metrics;
    let assessment = &record.assessment;
    let mut output = String::new();

    let _ = writeln!(output, "# {} ({})", record.name, record.email);
    let _ = writeln!(output, "Cohort {}", record.cohort);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Metrics");
    let _ = writeln!(output, "- attendance: {:.1}%", metrics.attendance_pct);
    let _ = writeln!(output, "- grades: {:.1}%", metrics.grade_pct);
    let _ = writeln!(output, "- pending assignments: {}", metrics.pending_assignments);
    let _ = writeln!(
        output,
        "- mood: {} (\"{}\")",
        metrics.mood.as_str(),
        metrics.mood_text
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Assessment");
    let _ = writeln!(
        output,
        "- risk: {}% {} ({:?} estimate)",
        assessment.risk_percentage, assessment.risk_level, assessment.source
    );
    let _ = writeln!(output, "- academic risk: {:.1}", assessment.academic_risk);
    let _ = writeln!(output, "- sentiment risk: {:.1}", assessment.sentiment_risk);
    let crisis = assessment.crisis_flag || metrics.crisis_language;
    let _ = writeln!(output, "- crisis: {}", if crisis { "yes" } else { "no" });

    match intervention::for_assessment(assessment) {
        Some((action, _)) => {
            let _ = writeln!(output, "- intervention: {}. {}", action.title, action.message);
        }
        None => {
            let _ = writeln!(output, "- intervention: none for level {}", assessment.risk_level);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Notes");
    if record.notes().is_empty() {
        let _ = writeln!(output, "No notes recorded.");
    } else {
        for note in record.notes() {
            let _ = writeln!(
                output,
                "- {}: {}",
                note.created_at.format("%Y-%m-%d %H:%M"),
                note.body
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AssessmentSource, MoodCategory, RecordedLevel, RiskAssessment, RiskLevel, StudentMetrics,
    };
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn record(name: &str, pct: u8, level: RecordedLevel, crisis: bool) -> StudentRecord {
        StudentRecord::new(
            Uuid::new_v4(),
            name,
            format!("{}@example.com", name.to_lowercase()),
            "2026",
            StudentMetrics {
                attendance_pct: 60.0,
                grade_pct: 55.0,
                pending_assignments: 2,
                mood: MoodCategory::Bad,
                mood_text: "bad".to_string(),
                crisis_language: false,
            },
            RiskAssessment {
                academic_risk: 46.5,
                sentiment_risk: 60.0,
                risk_percentage: pct,
                risk_level: level,
                crisis_flag: crisis,
                source: AssessmentSource::Local,
            },
        )
    }

    #[test]
    fn report_lists_distribution_alerts_and_notes() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 9, 30, 0).unwrap();
        let mut kiara = record("Kiara", 88, RiskLevel::High.into(), true);
        kiara.append_note("Called family", now - Duration::days(1));
        let records = vec![
            record("Avery", 30, RiskLevel::Low.into(), false),
            kiara,
            record("Jules", 50, RecordedLevel::Unknown("n/a".to_string()), false),
        ];

        let report = build_report(Some("2026"), now, &records);
        assert!(report.contains("Generated for 2026 on 2026-02-03 09:30 UTC"));
        assert!(report.contains("- HIGH: 1"));
        assert!(report.contains("- unknown: 1"));
        assert!(report.contains("- total: 3"));
        assert!(report.contains("[CRISIS] Kiara"));
        assert!(report.contains("- Kiara on 2026-02-02: Called family"));
    }

    #[test]
    fn empty_population_reports_placeholders() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 9, 30, 0).unwrap();
        let report = build_report(None, now, &[]);
        assert!(report.contains("all cohorts"));
        assert!(report.contains("No students recorded."));
        assert!(report.contains("No students need urgent attention."));
    }

    #[test]
    fn profile_shows_scores_crisis_intervention_and_notes() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 9, 30, 0).unwrap();
        let mut kiara = record("Kiara", 88, RiskLevel::High.into(), true);
        kiara.append_note("Called family", now - Duration::days(1));
        kiara.append_note("Counselor booked", now);

        let profile = build_profile(&kiara);
        assert!(profile.contains("# Kiara (kiara@example.com)"));
        assert!(profile.contains("- risk: 88% HIGH (Local estimate)"));
        assert!(profile.contains("- academic risk: 46.5"));
        assert!(profile.contains("- sentiment risk: 60.0"));
        assert!(profile.contains("- crisis: yes"));
        assert!(profile.contains("- intervention: Urgent intervention."));
        assert!(profile.contains("- 2026-02-02 09:30: Called family"));
        assert!(profile.contains("- 2026-02-03 09:30: Counselor booked"));
    }

    #[test]
    fn profile_of_unknown_level_has_no_intervention() {
        let jules = record("Jules", 50, RecordedLevel::Unknown("n/a".to_string()), false);
        let profile = build_profile(&jules);
        assert!(profile.contains("- crisis: no"));
        assert!(profile.contains("- intervention: none for level n/a"));
        assert!(profile.contains("No notes recorded."));
    }
}
