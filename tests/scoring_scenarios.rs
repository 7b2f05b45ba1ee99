use student_risk_engine::config::{AggregateWeights, EngineConfig, SentimentScale};
use student_risk_engine::models::{MoodCategory, RawMetrics, RecordedLevel, RiskLevel};
use student_risk_engine::risk::{sentiment_risk, RiskAggregator};
use student_risk_engine::RiskEngine;

fn raw(attendance: f64, grades: f64, assignments: f64, mood: &str) -> RawMetrics {
    RawMetrics {
        attendance_pct: Some(attendance),
        grade_pct: Some(grades),
        pending_assignments: Some(assignments),
        mood_signal: Some(mood.to_string()),
    }
}

#[test]
fn engaged_student_scores_low() {
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let assessment = engine.assess(&raw(85.0, 78.0, 12.0, "good")).unwrap();

    assert_eq!(assessment.sentiment_risk, 10.0);
    assert_eq!(assessment.academic_risk, 28.5);
    assert_eq!(assessment.risk_percentage, 25);
    assert_eq!(assessment.risk_level, RecordedLevel::Known(RiskLevel::Low));
    assert!(!assessment.crisis_flag);
}

#[test]
fn struggling_student_with_bad_mood_under_default_weights() {
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let assessment = engine.assess(&raw(45.0, 60.0, 0.0, "bad")).unwrap();

    assert_eq!(assessment.academic_risk, 47.5);
    assert!(assessment.sentiment_risk >= 60.0);
    assert_eq!(assessment.risk_percentage, 50);
    assert_eq!(assessment.risk_level, RecordedLevel::Known(RiskLevel::Medium));
}

#[test]
fn struggling_student_turns_high_when_sentiment_dominates() {
    let mut config = EngineConfig::default();
    config.aggregate = AggregateWeights {
        academic: 0.2,
        sentiment: 0.8,
    };
    config.sentiment.bad = 80.0;
    let engine = RiskEngine::new(config).unwrap();
    let assessment = engine.assess(&raw(45.0, 60.0, 0.0, "bad")).unwrap();

    assert_eq!(assessment.risk_percentage, 74);
    assert_eq!(assessment.risk_level, RecordedLevel::Known(RiskLevel::High));
    assert!(!assessment.crisis_flag);

    let worse = engine.assess(&raw(10.0, 20.0, 8.0, "hopeless")).unwrap();
    assert!(worse.risk_percentage > 80);
    assert!(worse.crisis_flag);
    assert_eq!(worse.risk_level, RecordedLevel::Known(RiskLevel::High));
}

#[test]
fn every_percentage_lands_in_exactly_one_tier() {
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let aggregator = engine.aggregator();
    for pct in 0..=100u8 {
        let level = aggregator.classify(pct);
        let matches = [
            pct <= 40 && level == RiskLevel::Low,
            pct > 40 && pct <= 70 && level == RiskLevel::Medium,
            pct > 70 && level == RiskLevel::High,
        ];
        assert_eq!(matches.iter().filter(|hit| **hit).count(), 1, "pct {pct}");
    }
}

#[test]
fn crisis_flag_tracks_percentage_across_inputs() {
    let engine = RiskEngine::new(EngineConfig::default()).unwrap();
    for attendance in (0..=100).step_by(10) {
        for grades in (0..=100).step_by(10) {
            for mood in ["good", "okay", "bad"] {
                let assessment = engine
                    .assess(&raw(f64::from(attendance), f64::from(grades), 5.0, mood))
                    .unwrap();
                assert_eq!(assessment.crisis_flag, assessment.risk_percentage > 80);
                if assessment.crisis_flag {
                    assert_eq!(assessment.risk_level, RecordedLevel::Known(RiskLevel::High));
                }
            }
        }
    }
}

#[test]
fn aggregation_is_repeatable() {
    let aggregator = RiskAggregator::new(AggregateWeights::default(), Default::default()).unwrap();
    let first = aggregator.aggregate(61.25, 35.0);
    let second = aggregator.aggregate(61.25, 35.0);
    assert_eq!(first, second);
}

#[test]
fn sentiment_ordering_holds() {
    let scale = SentimentScale::default();
    assert!(sentiment_risk(MoodCategory::Good, &scale) < sentiment_risk(MoodCategory::Okay, &scale));
    assert!(sentiment_risk(MoodCategory::Okay, &scale) < sentiment_risk(MoodCategory::Bad, &scale));
}
