use anyhow::{Context, Result};
use inference_core::{load_model, ModelHolder};
use shared::{download_file, ObjectStorageRepository, S3Uri};
use std::path::Path;
use tracing::{info, warn};

/// Fill the Model Holder exactly once before the server starts.
///
/// When an S3 location is given the artifact is fetched first. A failed or
/// rejected fetch is logged and the load falls back to whatever is already
/// at `model_path`, so neither step can stop the process.
pub async fn load_model_holder(
    model_path: &Path,
    source: Option<(&dyn ObjectStorageRepository, &S3Uri)>,
) -> ModelHolder {
    if let Some((repository, uri)) = source {
        info!("Fetching model artifact from {}", uri);
        match fetch_artifact(repository, uri, model_path).await {
            Ok(()) => info!("Installed model artifact from {} at {}", uri, model_path.display()),
            Err(err) => warn!("Could not fetch model artifact from {}: {:#}", uri, err),
        }
    }

    ModelHolder::load(model_path)
}

/// Download into a staging file beside `model_path` and rename it into place
/// only once it loads as a valid artifact. The existing file is untouched
/// on any failure.
async fn fetch_artifact(repository: &dyn ObjectStorageRepository, uri: &S3Uri, model_path: &Path) -> Result<()> {
    let dir = match model_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let staged = tempfile::Builder::new()
        .prefix(".model-")
        .suffix(".json")
        .tempfile_in(dir)
        .with_context(|| format!("staging download in {}", dir.display()))?;

    download_file(repository, uri, staged.path()).await?;
    load_model(staged.path()).context("fetched artifact is not a loadable model")?;

    staged
        .persist(model_path)
        .with_context(|| format!("replacing {}", model_path.display()))?;
    Ok(())
}
