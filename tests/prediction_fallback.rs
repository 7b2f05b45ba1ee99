use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use student_risk_engine::config::EngineConfig;
use student_risk_engine::error::PredictionUnavailable;
use student_risk_engine::models::{AssessmentSource, RawMetrics, RecordedLevel, RiskLevel};
use student_risk_engine::prediction::{DisabledPrediction, HttpPredictionClient, PredictionSource};
use student_risk_engine::{assess_with_fallback, RiskEngine};

fn raw() -> RawMetrics {
    RawMetrics {
        attendance_pct: Some(70.0),
        grade_pct: Some(70.0),
        pending_assignments: Some(0.0),
        mood_signal: Some("okay".to_string()),
    }
}

fn engine() -> RiskEngine {
    RiskEngine::new(EngineConfig::default()).unwrap()
}

#[tokio::test]
async fn remote_prediction_overrides_local_estimate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_partial_json(json!({
            "attendance": 70.0,
            "grades": 70.0,
            "assignments": 0,
            "mood": "okay"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "risk_percentage": 99,
            "risk_level": "HIGH"
        })))
        .mount(&server)
        .await;

    let client = HttpPredictionClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let engine = engine();
    let local = engine.assess(&raw()).unwrap();
    assert_eq!(local.risk_percentage, 29);

    let (_, assessment) = assess_with_fallback(&engine, &client, &raw()).await.unwrap();
    assert_eq!(assessment.risk_percentage, 99);
    assert_eq!(assessment.risk_level, RecordedLevel::Known(RiskLevel::High));
    assert!(assessment.crisis_flag);
    assert_eq!(assessment.source, AssessmentSource::Remote);
}

#[tokio::test]
async fn timeout_falls_back_to_local_estimate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "risk_percentage": 99, "risk_level": "HIGH" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = HttpPredictionClient::new(server.uri(), Duration::from_millis(100)).unwrap();
    let engine = engine();
    let metrics = engine.normalize(&raw()).unwrap();
    assert!(matches!(
        client.predict(&metrics).await,
        Err(PredictionUnavailable::Timeout(_))
    ));

    let (_, assessment) = assess_with_fallback(&engine, &client, &raw()).await.unwrap();
    assert_eq!(assessment, engine.score(&metrics));
    assert_eq!(assessment.source, AssessmentSource::Local);
}

#[tokio::test]
async fn server_error_falls_back_to_local_estimate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = HttpPredictionClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let engine = engine();
    let metrics = engine.normalize(&raw()).unwrap();
    assert!(matches!(
        client.predict(&metrics).await,
        Err(PredictionUnavailable::Status(503))
    ));

    let (_, assessment) = assess_with_fallback(&engine, &client, &raw()).await.unwrap();
    assert_eq!(assessment.source, AssessmentSource::Local);
}

#[tokio::test]
async fn malformed_body_falls_back_to_local_estimate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "risk": "high" })))
        .mount(&server)
        .await;

    let client = HttpPredictionClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let engine = engine();
    let metrics = engine.normalize(&raw()).unwrap();
    assert!(matches!(
        client.predict(&metrics).await,
        Err(PredictionUnavailable::Decode(_))
    ));

    let (_, assessment) = assess_with_fallback(&engine, &client, &raw()).await.unwrap();
    assert_eq!(assessment.source, AssessmentSource::Local);
}

#[tokio::test]
async fn incomplete_input_is_reported_even_with_remote_available() {
    let mut input = raw();
    input.mood_signal = None;
    let err = assess_with_fallback(&engine(), &DisabledPrediction, &input)
        .await
        .unwrap_err();
    assert_eq!(err.missing, vec!["mood_signal"]);
}

#[tokio::test]
async fn unreachable_service_falls_back() {
    let client =
        HttpPredictionClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let (_, assessment) = assess_with_fallback(&engine(), &client, &raw()).await.unwrap();
    assert_eq!(assessment.source, AssessmentSource::Local);
    assert_eq!(assessment.risk_percentage, 29);
}
