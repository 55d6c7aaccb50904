pub mod artifact;
pub mod classifier;
pub mod dataset;
pub mod error;
pub mod forest;
pub mod holder;
pub mod metrics;
pub mod service;
pub mod types;

#[cfg(test)]
pub mod integration_tests;

pub use artifact::{
    default_model_path, load_model, save_metrics, save_model, DEFAULT_MODEL_DIR, METRICS_FILE_NAME,
    MODEL_FILE_NAME,
};
pub use classifier::Classifier;
pub use dataset::Dataset;
pub use error::InferenceError;
pub use forest::{DecisionTree, RandomForestClassifier};
pub use holder::{ModelHolder, ModelStatus};
pub use metrics::{accuracy_score, classification_report, ClassificationReport};
pub use service::{InferenceService, InferenceServiceTrait};
pub use types::*;

#[cfg(any(test, feature = "testing"))]
pub use service::MockInferenceServiceTrait;
