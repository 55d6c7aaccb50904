pub mod s3_models;
