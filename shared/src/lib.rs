pub mod error;
pub mod logging;
pub mod models;
pub mod repository;

pub use error::*;
pub use logging::parse_log_level;
pub use models::s3_models::*;
pub use repository::s3_repository::*;

#[cfg(any(test, feature = "testing"))]
pub use models::s3_models::MockObjectStorageRepository;
