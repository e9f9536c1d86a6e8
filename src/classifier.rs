use crate::config::ClassifierConfig;
use crate::record::{PatternLabels, Prediction};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("image reference is empty")]
    InvalidInput,
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classifier returned status {0}")]
    BadStatus(reqwest::StatusCode),
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait Classifier: Send + Sync + 'static {
    async fn classify(
        &self,
        image_url: &str,
        filename: &str,
    ) -> Result<Prediction, ClassifierError>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    #[serde(rename = "imageUrl")]
    image_url: &'a str,
    filename: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    pattern: i64,
    confidence: f64,
}

pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    labels: PatternLabels,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            labels: PatternLabels::new(config.labels.clone()),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    #[instrument(skip(self))]
    async fn classify(
        &self,
        image_url: &str,
        filename: &str,
    ) -> Result<Prediction, ClassifierError> {
        if image_url.trim().is_empty() {
            return Err(ClassifierError::InvalidInput);
        }

        let request = ClassifyRequest {
            image_url,
            filename,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::BadStatus(status));
        }

        let body = response.text().await?;
        let decoded: ClassifyResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

        let confidence = to_percent(decoded.confidence)?;
        let pattern = self.labels.resolve(decoded.pattern);
        tracing::debug!(%pattern, confidence, "classification succeeded");

        Ok(Prediction {
            pattern,
            confidence,
        })
    }
}

fn to_percent(probability: f64) -> Result<u8, ClassifierError> {
    if !probability.is_finite() {
        return Err(ClassifierError::MalformedResponse(format!(
            "confidence {} is not a probability",
            probability
        )));
    }
    Ok((probability.clamp(0.0, 1.0) * 100.0).round() as u8)
}
