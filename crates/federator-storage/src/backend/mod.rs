pub mod azure;
pub mod gcs;
pub mod local;
pub mod s3;
