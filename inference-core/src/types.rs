use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a prediction call: one row of numeric features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub features: Vec<f64>,
}

/// Predicted class label plus per-class probabilities in the model's class order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: i64,
    pub probability: Vec<f64>,
}

impl PredictionResponse {
    pub fn new(prediction: i64, probability: Vec<f64>) -> Self {
        Self {
            prediction,
            probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub random_state: u64,
    pub min_samples_split: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            random_state: 42,
            min_samples_split: 2,
        }
    }
}

/// Contents of `metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
}

/// What the server reports about the model it is holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub algorithm: String,
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub trained_at: Option<DateTime<Utc>>,
}
