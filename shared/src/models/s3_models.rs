use crate::error::StorageError;
use anyhow::Result;
use std::fmt;
use std::str::FromStr;

/// Location of an object in S3, written as `s3://bucket/key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Uri {
    pub bucket: String,
    pub key: String,
}

impl S3Uri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Treat this URI as a prefix and append a file name to it
    pub fn join(&self, name: &str) -> S3Uri {
        let prefix = self.key.trim_end_matches('/');
        let key = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };
        S3Uri::new(self.bucket.clone(), key)
    }
}

impl FromStr for S3Uri {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("s3://")
            .ok_or_else(|| StorageError::InvalidUri(s.to_string()))?;

        let (bucket, key) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (rest, ""),
        };

        if bucket.is_empty() {
            return Err(StorageError::InvalidUri(s.to_string()));
        }

        Ok(S3Uri::new(bucket, key))
    }
}

impl fmt::Display for S3Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: bytes::Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GetObjectRequest {
    pub bucket: String,
    pub key: String,
}

impl From<&S3Uri> for GetObjectRequest {
    fn from(uri: &S3Uri) -> Self {
        Self {
            bucket: uri.bucket.clone(),
            key: uri.key.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetObjectResponse {
    pub body: bytes::Bytes,
    pub etag: String,
}

/// Object storage operations needed to move model artifacts around
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait]
pub trait ObjectStorageRepository: Send + Sync {
    /// Put an object into storage, returning its etag
    async fn put_object(&self, request: PutObjectRequest) -> Result<String>;

    /// Get an object from storage
    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_uri() {
        let uri: S3Uri = "s3://models/churn/model.json".parse().unwrap();
        assert_eq!(uri.bucket, "models");
        assert_eq!(uri.key, "churn/model.json");
        assert_eq!(uri.to_string(), "s3://models/churn/model.json");
    }

    #[test]
    fn test_parse_bucket_only() {
        let uri: S3Uri = "s3://models".parse().unwrap();
        assert_eq!(uri.bucket, "models");
        assert_eq!(uri.key, "");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert_eq!(
            "https://models/model.json".parse::<S3Uri>(),
            Err(StorageError::InvalidUri("https://models/model.json".to_string()))
        );
        assert!("s3:///model.json".parse::<S3Uri>().is_err());
    }

    #[test]
    fn test_join() {
        let prefix: S3Uri = "s3://models/runs/42/".parse().unwrap();
        assert_eq!(prefix.join("metrics.json").key, "runs/42/metrics.json");

        let root: S3Uri = "s3://models".parse().unwrap();
        assert_eq!(root.join("model.json").key, "model.json");
    }
}
