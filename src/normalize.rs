use crate::error::IncompleteInputError;
use crate::models::{MoodCategory, RawMetrics, StudentMetrics};
use crate::mood::MoodClassifier;

/// Validates presence of every metric and clamps numeric values into range.
///
/// Missing values are reported together; none are defaulted. Non-finite
/// numbers and blank mood text count as missing.
pub fn normalize<C>(raw: &RawMetrics, classifier: &C) -> Result<StudentMetrics, IncompleteInputError>
where
    C: MoodClassifier + ?Sized,
{
    let attendance = raw.attendance_pct.filter(|value| value.is_finite());
    let grade = raw.grade_pct.filter(|value| value.is_finite());
    let pending = raw.pending_assignments.filter(|value| value.is_finite());
    let mood = raw
        .mood_signal
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());

    let mut missing = Vec::new();
    if attendance.is_none() {
        missing.push("attendance_pct");
    }
    if grade.is_none() {
        missing.push("grade_pct");
    }
    if pending.is_none() {
        missing.push("pending_assignments");
    }
    if mood.is_none() {
        missing.push("mood_signal");
    }

    match (attendance, grade, pending, mood) {
        (Some(attendance), Some(grade), Some(pending), Some(mood)) => {
            let (category, crisis_language) = match MoodCategory::from_token(mood) {
                Some(category) => (category, false),
                None => (classifier.classify(mood), classifier.signals_crisis(mood)),
            };
            Ok(StudentMetrics {
                attendance_pct: clamp_pct(attendance),
                grade_pct: clamp_pct(grade),
                pending_assignments: pending.max(0.0).floor() as u32,
                mood: category,
                mood_text: mood.to_string(),
                crisis_language,
            })
        }
        _ => Err(IncompleteInputError { missing }),
    }
}

fn clamp_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
