use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub pattern: String,
    pub confidence: u8,
}

impl Prediction {
    /// Sentinel shown after a failed classification.
    pub fn error() -> Self {
        Self {
            pattern: "Error".to_string(),
            confidence: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub pattern: String,
    pub confidence: u8,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[derive(Debug, Clone)]
pub struct PatternLabels {
    names: Vec<String>,
}

impl PatternLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn resolve(&self, index: i64) -> String {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.names.get(i))
            .cloned()
            .unwrap_or_else(|| format!("Pattern {}", index))
    }
}
