//! Client for the external prediction service.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::config::PredictionConfig;
use crate::error::PredictionUnavailable;
use crate::models::{RemotePrediction, StudentMetrics};

pub trait PredictionSource {
    fn predict(
        &self,
        metrics: &StudentMetrics,
    ) -> impl Future<Output = Result<RemotePrediction, PredictionUnavailable>> + Send;
}

/// Offline mode: every call reports the service as unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPrediction;

impl PredictionSource for DisabledPrediction {
    async fn predict(
        &self,
        _metrics: &StudentMetrics,
    ) -> Result<RemotePrediction, PredictionUnavailable> {
        Err(PredictionUnavailable::Disabled)
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    attendance: f64,
    grades: f64,
    assignments: u32,
    mood: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPredictionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PredictionUnavailable> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PredictionUnavailable::Transport)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// `None` when no service URL is configured.
    pub fn from_config(config: &PredictionConfig) -> Result<Option<Self>, PredictionUnavailable> {
        config
            .base_url
            .as_deref()
            .map(|url| Self::new(url, config.timeout))
            .transpose()
    }

    fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url)
    }

    async fn send(&self, metrics: &StudentMetrics) -> Result<RemotePrediction, PredictionUnavailable> {
        let body = PredictRequest {
            attendance: metrics.attendance_pct,
            grades: metrics.grade_pct,
            assignments: metrics.pending_assignments,
            mood: &metrics.mood_text,
        };

        let response = self
            .client
            .post(self.predict_url())
            .json(&body)
            .send()
            .await
            .map_err(|err| self.classify_error(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictionUnavailable::Status(status.as_u16()));
        }

        let prediction: RemotePrediction = response
            .json()
            .await
            .map_err(|err| match self.classify_error(err) {
                PredictionUnavailable::Transport(err) => PredictionUnavailable::Decode(err.to_string()),
                other => other,
            })?;

        if !prediction.risk_percentage.is_finite() {
            return Err(PredictionUnavailable::Decode(format!(
                "risk_percentage is not a number: {}",
                prediction.risk_percentage
            )));
        }
        Ok(prediction)
    }

    fn classify_error(&self, err: reqwest::Error) -> PredictionUnavailable {
        if err.is_timeout() {
            PredictionUnavailable::Timeout(self.timeout)
        } else {
            PredictionUnavailable::Transport(err)
        }
    }
}

impl PredictionSource for HttpPredictionClient {
    async fn predict(
        &self,
        metrics: &StudentMetrics,
    ) -> Result<RemotePrediction, PredictionUnavailable> {
        tokio::time::timeout(self.timeout, self.send(metrics))
            .await
            .map_err(|_| PredictionUnavailable::Timeout(self.timeout))?
    }
}

/// The HTTP client when a service URL is configured, offline otherwise.
#[derive(Debug, Clone)]
pub enum ConfiguredPrediction {
    Http(HttpPredictionClient),
    Disabled(DisabledPrediction),
}

impl ConfiguredPrediction {
    pub fn from_config(config: &PredictionConfig) -> Result<Self, PredictionUnavailable> {
        Ok(match HttpPredictionClient::from_config(config)? {
            Some(client) => Self::Http(client),
            None => Self::Disabled(DisabledPrediction),
        })
    }
}

impl PredictionSource for ConfiguredPrediction {
    async fn predict(
        &self,
        metrics: &StudentMetrics,
    ) -> Result<RemotePrediction, PredictionUnavailable> {
        match self {
            Self::Http(client) => client.predict(metrics).await,
            Self::Disabled(disabled) => disabled.predict(metrics).await,
        }
    }
}
