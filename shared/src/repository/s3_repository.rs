use crate::error::StorageError;
use crate::models::s3_models::*;
use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::info;

/// Connection settings for an S3-compatible store.
///
/// Every field is optional: with nothing set the AWS default provider chain
/// (environment, profile, instance role) decides region and credentials,
/// which is what a SageMaker container expects.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl S3Settings {
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION").ok(),
            endpoint: std::env::var("S3_ENDPOINT").ok(),
            access_key: std::env::var("S3_ACCESS_KEY").ok(),
            secret_key: std::env::var("S3_SECRET_KEY").ok(),
        }
    }
}

/// S3-compatible object storage repository implementation
/// Works with AWS S3 as well as MinIO or any other S3-compatible service
pub struct AwsS3Repository {
    client: Client,
}

impl AwsS3Repository {
    pub async fn new(settings: S3Settings) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = settings.region {
            loader = loader.region(Region::new(region));
        }

        if let (Some(access_key), Some(secret_key)) = (settings.access_key, settings.secret_key) {
            let creds = aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "sagemaker-lab-static",
            );
            loader = loader.credentials_provider(creds);
        }

        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;

        // Custom endpoints (MinIO and friends) rarely support virtual-hosted buckets
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(settings.endpoint.is_some())
            .build();
        let client = Client::from_conf(s3_config);

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ObjectStorageRepository for AwsS3Repository {
    async fn put_object(&self, request: PutObjectRequest) -> Result<String> {
        let mut put_request = self
            .client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(request.body.into());

        if let Some(content_type) = request.content_type {
            put_request = put_request.content_type(content_type);
        }

        let response = put_request.send().await?;

        Ok(response.e_tag().unwrap_or_default().to_string())
    }

    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectResponse> {
        let response = self
            .client
            .get_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if service_err.is_no_such_key() => {
                    anyhow::Error::new(StorageError::NoSuchKey(format!("s3://{}/{}", request.bucket, request.key)))
                }
                _ => anyhow::Error::new(err),
            })?;

        let etag = response.e_tag().unwrap_or_default().to_string();
        let body = response.body.collect().await?.into_bytes();

        Ok(GetObjectResponse { body, etag })
    }
}

/// Upload a local file to the given location
pub async fn upload_file(
    repository: &dyn ObjectStorageRepository,
    local_path: &Path,
    destination: &S3Uri,
    content_type: &str,
) -> Result<String> {
    let body = tokio::fs::read(local_path)
        .await
        .with_context(|| format!("reading {}", local_path.display()))?;

    let etag = repository
        .put_object(PutObjectRequest {
            bucket: destination.bucket.clone(),
            key: destination.key.clone(),
            body: bytes::Bytes::from(body),
            content_type: Some(content_type.to_string()),
        })
        .await
        .with_context(|| format!("uploading to {}", destination))?;

    info!("Uploaded {} to {}", local_path.display(), destination);
    Ok(etag)
}

/// Download an object into a local file, creating parent directories as needed
pub async fn download_file(
    repository: &dyn ObjectStorageRepository,
    source: &S3Uri,
    local_path: &Path,
) -> Result<u64> {
    let response = repository
        .get_object(GetObjectRequest::from(source))
        .await
        .with_context(|| format!("downloading {}", source))?;

    if let Some(parent) = local_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(local_path, &response.body)
        .await
        .with_context(|| format!("writing {}", local_path.display()))?;

    info!("Downloaded {} (etag {}) to {}", source, response.etag, local_path.display());
    Ok(response.body.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_file_sends_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, br#"{"test_accuracy":0.9}"#).unwrap();

        let mut mock = MockObjectStorageRepository::new();
        mock.expect_put_object()
            .withf(|req| {
                req.bucket == "artifacts"
                    && req.key == "run-1/metrics.json"
                    && req.content_type.as_deref() == Some("application/json")
                    && req.body.as_ref() == br#"{"test_accuracy":0.9}"#
            })
            .times(1)
            .returning(|_| Ok("etag-1".to_string()));

        let destination = S3Uri::new("artifacts", "run-1/metrics.json");
        let etag = upload_file(&mock, &path, &destination, "application/json").await.unwrap();
        assert_eq!(etag, "etag-1");
    }

    #[tokio::test]
    async fn test_download_file_writes_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");

        let mut mock = MockObjectStorageRepository::new();
        mock.expect_get_object()
            .withf(|req| req.bucket == "artifacts" && req.key == "model.json")
            .returning(|_| {
                Ok(GetObjectResponse {
                    body: bytes::Bytes::from_static(b"{}"),
                    etag: "etag".to_string(),
                })
            });

        let source = S3Uri::new("artifacts", "model.json");
        let written = download_file(&mock, &source, &path).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_download_file_propagates_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut mock = MockObjectStorageRepository::new();
        mock.expect_get_object()
            .returning(|req| Err(StorageError::NoSuchKey(req.key).into()));

        let source = S3Uri::new("artifacts", "missing.json");
        let err = download_file(&mock, &source, &path).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<StorageError>(),
            Some(&StorageError::NoSuchKey("missing.json".to_string()))
        );
        assert!(!path.exists());
    }
}
