use crate::record::Prediction;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler lifecycle as observed from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Scheduled,
    Running,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorState {
    pub image_url: String,
    pub filename: String,
    pub prediction: Option<Prediction>,
    pub last_updated: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl MonitorState {
    pub fn initial(image_url: String, filename: String) -> Self {
        Self {
            image_url,
            filename,
            prediction: None,
            last_updated: None,
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub monitor: MonitorState,
    pub auto_refresh: bool,
    pub phase: Phase,
    pub next_refresh_ms: Option<u64>,
}
