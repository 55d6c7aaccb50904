pub mod s3_repository;
