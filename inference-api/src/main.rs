use anyhow::Result;
use inference_api::{bootstrap::load_model_holder, config::ServerConfig, router, AppState};
use inference_core::{InferenceService, InferenceServiceTrait, ModelStatus};
use shared::{AwsS3Repository, ObjectStorageRepository};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    // The holder is filled once here and never touched again
    let holder = match &config.model_s3_uri {
        Some(uri) => {
            let repository = AwsS3Repository::new(config.s3.clone()).await?;
            let repository: &dyn ObjectStorageRepository = &repository;
            load_model_holder(&config.model_path, Some((repository, uri))).await
        }
        None => load_model_holder(&config.model_path, None).await,
    };

    if let ModelStatus::LoadFailed(reason) = holder.status() {
        warn!("Model load failed: {}", reason);
    }

    let service = InferenceService::new(holder);
    match service.model_summary() {
        Some(summary) => info!(
            "Serving {} model: {} features, classes {:?}",
            summary.algorithm, summary.n_features, summary.classes
        ),
        None => warn!("No model loaded; /ping and /invocations will answer 503 until restart"),
    }

    let state = AppState {
        inference_service: Arc::new(service),
    };
    let app = router(state);

    let endpoint = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&endpoint).await?;
    info!("SageMaker inference server listening on {endpoint}");

    axum::serve(listener, app).await?;

    Ok(())
}
