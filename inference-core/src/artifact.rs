use crate::forest::{RandomForestClassifier, ALGORITHM};
use crate::types::TrainingMetrics;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE_NAME: &str = "model.json";
pub const METRICS_FILE_NAME: &str = "metrics.json";
pub const DEFAULT_MODEL_DIR: &str = "/opt/ml/model";
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub fn default_model_path() -> PathBuf {
    Path::new(DEFAULT_MODEL_DIR).join(MODEL_FILE_NAME)
}

#[derive(Serialize)]
struct ArtifactOut<'a> {
    format_version: u32,
    algorithm: &'a str,
    model: &'a RandomForestClassifier,
}

#[derive(Deserialize)]
struct ArtifactIn {
    format_version: u32,
    algorithm: String,
    model: RandomForestClassifier,
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Write `model.json` into `dir` and return its path
pub fn save_model(model: &RandomForestClassifier, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(MODEL_FILE_NAME);
    let artifact = ArtifactOut {
        format_version: ARTIFACT_FORMAT_VERSION,
        algorithm: ALGORITHM,
        model,
    };
    write_json(&artifact, &path)?;
    info!("Model saved to {}", path.display());
    Ok(path)
}

/// Read and validate a model artifact
pub fn load_model(path: &Path) -> Result<RandomForestClassifier> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let artifact: ArtifactIn = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("decoding {}", path.display()))?;

    if artifact.format_version != ARTIFACT_FORMAT_VERSION {
        bail!(
            "unsupported artifact format version {} (expected {})",
            artifact.format_version,
            ARTIFACT_FORMAT_VERSION
        );
    }
    if artifact.algorithm != ALGORITHM {
        bail!("unsupported algorithm '{}'", artifact.algorithm);
    }

    artifact.model.validate().with_context(|| format!("validating {}", path.display()))?;
    Ok(artifact.model)
}

/// Write `metrics.json` into `dir` and return its path
pub fn save_metrics(metrics: &TrainingMetrics, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(METRICS_FILE_NAME);
    write_json(metrics, &path)?;
    Ok(path)
}
