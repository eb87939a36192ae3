//! Error taxonomy for storage adapters.

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("destination is not a file: {0}")]
    NotAFile(String),
    #[error("backend failure: {0}")]
    Backend(String),
}
