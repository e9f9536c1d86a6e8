use crate::config::HistoryConfig;
use crate::record::PredictionRecord;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to persist record: {0}")]
    Persist(String),
    #[error("failed to fetch history: {0}")]
    Fetch(String),
}

#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    async fn append(&self, record: &PredictionRecord) -> Result<String, HistoryError>;
    async fn fetch_recent(&self, max_count: usize)
        -> Result<Vec<PredictionRecord>, HistoryError>;
}

#[derive(Deserialize)]
struct AppendResponse {
    id: String,
}

pub struct HttpHistoryStore {
    client: reqwest::Client,
    collection_url: String,
}

impl HttpHistoryStore {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            collection_url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.collection
            ),
        }
    }
}

#[async_trait]
impl HistoryStore for HttpHistoryStore {
    #[instrument(skip(self, record))]
    async fn append(&self, record: &PredictionRecord) -> Result<String, HistoryError> {
        let response = self
            .client
            .post(&self.collection_url)
            .json(record)
            .send()
            .await
            .map_err(|e| HistoryError::Persist(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Persist(format!(
                "backend returned status {}",
                status
            )));
        }

        let decoded: AppendResponse = response
            .json()
            .await
            .map_err(|e| HistoryError::Persist(e.to_string()))?;

        Ok(decoded.id)
    }

    #[instrument(skip(self))]
    async fn fetch_recent(
        &self,
        max_count: usize,
    ) -> Result<Vec<PredictionRecord>, HistoryError> {
        let response = self
            .client
            .get(&self.collection_url)
            .query(&[
                ("limit", max_count.to_string()),
                ("order", "desc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| HistoryError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Fetch(format!(
                "backend returned status {}",
                status
            )));
        }

        let mut records: Vec<PredictionRecord> = response
            .json()
            .await
            .map_err(|e| HistoryError::Fetch(e.to_string()))?;

        // The backend is expected to order and cap; enforce both anyway.
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(max_count);

        Ok(records)
    }
}

#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<PredictionRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with plausible records for development without a
    /// reachable history backend.
    pub fn with_sample_data() -> Self {
        let now = Utc::now();
        let samples = [
            ("Normal Swarm", 94u8, 45i64),
            ("Clustering", 78, 30),
            ("Erratic Movement", 87, 15),
            ("Normal Swarm", 91, 5),
        ]
        .into_iter()
        .map(|(pattern, confidence, minutes_ago)| PredictionRecord {
            timestamp: now - Duration::minutes(minutes_ago),
            filename: "sample_tank.jpg".to_string(),
            pattern: pattern.to_string(),
            confidence,
            image_url: "https://img.example.com/sample_tank.jpg".to_string(),
        })
        .collect();

        Self {
            records: RwLock::new(samples),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: &PredictionRecord) -> Result<String, HistoryError> {
        self.records.write().push(record.clone());
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn fetch_recent(
        &self,
        max_count: usize,
    ) -> Result<Vec<PredictionRecord>, HistoryError> {
        let mut records = self.records.read().clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(max_count);
        Ok(records)
    }
}
