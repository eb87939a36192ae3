//! `FileProvider`: opens a source file for the chunk producer and
//! answers cheap existence checks.

use async_trait::async_trait;
use tokio::io::AsyncRead;
use std::pin::Pin;

use crate::error::StorageError;

pub struct FileHandle {
    pub stream: Pin<Box<dyn AsyncRead + Send>>,
    pub size: u64,
}

/// A request identifying a single source file, independent of which
/// backend it lives on.
#[derive(Debug, Clone)]
pub struct FileTransferRequest {
    pub storage_container: String,
    pub path: String,
}

#[async_trait]
pub trait FileProvider: Send + Sync {
    /// Opens the source after a metadata probe establishing `size`.
    /// 404/backend failure surfaces as
    /// [`StorageError::NotFound`]/[`StorageError::Backend`].
    async fn get(&self, request: &FileTransferRequest) -> Result<FileHandle, StorageError>;

    /// Cheap existence check; does not open a stream.
    async fn validate_path(&self, request: &FileTransferRequest) -> Result<(), StorageError>;
}
