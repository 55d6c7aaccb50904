use crate::artifact::load_model;
use crate::classifier::Classifier;
use crate::error::InferenceError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    Unloaded,
    Loaded,
    LoadFailed(String),
}

/// Owns the model for the life of the process.
///
/// The holder is filled at most once, at construction. There is no reload:
/// serving a new model means restarting the process.
#[derive(Clone)]
pub struct ModelHolder {
    model: Option<Arc<dyn Classifier>>,
    status: ModelStatus,
}

impl ModelHolder {
    pub fn empty() -> Self {
        Self {
            model: None,
            status: ModelStatus::Unloaded,
        }
    }

    pub fn with_model(model: impl Classifier + 'static) -> Self {
        Self {
            model: Some(Arc::new(model)),
            status: ModelStatus::Loaded,
        }
    }

    /// Best-effort load from an artifact file. A failure is logged and leaves
    /// the holder empty; it never aborts the caller.
    pub fn load(path: &Path) -> Self {
        match load_model(path) {
            Ok(model) => {
                info!(
                    "Model loaded successfully from {} ({} trees, {} features)",
                    path.display(),
                    model.trees().len(),
                    model.n_features()
                );
                Self::with_model(model)
            }
            Err(err) => {
                warn!("Could not load model from {}: {:#}", path.display(), err);
                Self {
                    model: None,
                    status: ModelStatus::LoadFailed(format!("{:#}", err)),
                }
            }
        }
    }

    pub fn get(&self) -> Result<&dyn Classifier, InferenceError> {
        self.model.as_deref().ok_or(InferenceError::ModelNotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn status(&self) -> &ModelStatus {
        &self.status
    }
}

impl fmt::Debug for ModelHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHolder").field("status", &self.status).finish()
    }
}
