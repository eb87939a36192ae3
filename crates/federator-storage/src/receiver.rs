//! `ReceivedFileStorage`: publishes an assembled temp file to its
//! final destination.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::StorageError;

/// Result of a successful publish.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub local_path: Option<PathBuf>,
    pub remote_uri: Option<String>,
}

#[async_trait]
pub trait ReceivedFileStorage: Send + Sync {
    /// Publishes `local_file` (the closed, verified temp file) as
    /// `original_name` under `destination`. On object-store failure
    /// the temp file is deleted and no remote URI is returned — the
    /// caller must not advance the consumer offset in that case.
    async fn store(
        &self,
        local_file: &std::path::Path,
        original_name: &str,
        destination: &str,
    ) -> Result<StoredFile, StorageError>;
}
