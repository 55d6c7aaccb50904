pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use inference_core::InferenceServiceTrait;
use std::sync::Arc;

/// The service only reads the Model Holder after startup, so no lock is needed
#[derive(Clone)]
pub struct AppState {
    pub inference_service: Arc<dyn InferenceServiceTrait>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // SageMaker hosting contract
        .route("/ping", get(handlers::ping))
        .route("/invocations", post(handlers::invocations))
        .route("/", get(handlers::root))
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .with_state(state)
}
