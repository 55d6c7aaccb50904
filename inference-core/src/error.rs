/// Errors surfaced on the prediction path.
///
/// Each variant maps to one externally visible failure: `ModelNotLoaded` is a
/// service-unavailable condition, `InvalidInput` is a bad request.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    ModelNotLoaded,
    InvalidInput(String),
}

impl InferenceError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        InferenceError::InvalidInput(msg.into())
    }
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceError::ModelNotLoaded => write!(f, "Model not loaded"),
            InferenceError::InvalidInput(msg) => write!(f, "Prediction error: {}", msg),
        }
    }
}

impl std::error::Error for InferenceError {}
