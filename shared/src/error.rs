#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    NoSuchKey(String),
    InvalidUri(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NoSuchKey(key) => write!(f, "NoSuchKey: {}", key),
            StorageError::InvalidUri(uri) => write!(f, "InvalidUri: {}", uri),
        }
    }
}

impl std::error::Error for StorageError {}
