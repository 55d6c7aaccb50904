use anyhow::{Context, Result};
use inference_core::default_model_path;
use shared::{parse_log_level, S3Settings, S3Uri};
use std::path::PathBuf;
use tracing::Level;

/// Server settings: defaults match the SageMaker hosting contract
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub interface: String,

    /// Port to bind (default: 8080, the port SageMaker routes to)
    pub port: u16,

    /// Model artifact read once at startup (default: /opt/ml/model/model.json)
    pub model_path: PathBuf,

    /// Optional S3 location to fetch the artifact from before loading
    pub model_s3_uri: Option<S3Uri>,

    pub s3: S3Settings,

    pub log_level: Level,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interface: "0.0.0.0".to_string(),
            port: 8080,
            model_path: default_model_path(),
            model_s3_uri: None,
            s3: S3Settings::default(),
            log_level: Level::INFO,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.s3 = S3Settings::from_env();
        Ok(config)
    }

    /// Build from any key lookup, falling back to defaults for missing keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(interface) = lookup("INTERFACE") {
            config.interface = interface;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port.parse().with_context(|| format!("invalid PORT '{}'", port))?;
        }
        if let Some(path) = lookup("MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Some(uri) = lookup("MODEL_S3_URI") {
            config.model_s3_uri = Some(uri.parse().with_context(|| format!("invalid MODEL_S3_URI '{}'", uri))?);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = parse_log_level(&level);
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.interface, self.port)
    }
}
