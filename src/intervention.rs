use serde::Serialize;

use crate::models::{RiskAssessment, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Intervention {
    pub title: &'static str,
    pub message: &'static str,
    pub requires_action: bool,
}

pub fn level_to_intervention(level: RiskLevel) -> Intervention {
    match level {
        RiskLevel::Low => Intervention {
            title: "On track",
            message: "Student is progressing well. Continue regular monitoring.",
            requires_action: false,
        },
        RiskLevel::Medium => Intervention {
            title: "Schedule a check-in",
            message: "Arrange a one-to-one check-in with the student's mentor this week.",
            requires_action: true,
        },
        RiskLevel::High => Intervention {
            title: "Urgent intervention",
            message: "Contact the student and counseling services immediately.",
            requires_action: true,
        },
    }
}

/// Intervention plus the crisis flag, for an assessment whose level is known.
pub fn for_assessment(assessment: &RiskAssessment) -> Option<(Intervention, bool)> {
    assessment
        .risk_level
        .known()
        .map(|level| (level_to_intervention(level), assessment.crisis_flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_low_needs_no_action() {
        assert!(!level_to_intervention(RiskLevel::Low).requires_action);
        assert!(level_to_intervention(RiskLevel::Medium).requires_action);
        assert!(level_to_intervention(RiskLevel::High).requires_action);
        assert_eq!(
            level_to_intervention(RiskLevel::High).title,
            "Urgent intervention"
        );
    }
}
