//! Pluggable storage adapters: a read side ([`FileProvider`]) and a
//! write side ([`ReceivedFileStorage`]), each with local filesystem,
//! S3, Azure Blob and GCS variants, selected at runtime through
//! [`StorageBackend`] instead of a per-cloud inheritance hierarchy of
//! concrete source/sink classes.

pub mod backend;
pub mod error;
pub mod key;
pub mod provider;
pub mod receiver;

pub use error::StorageError;
pub use key::resolve_key;
pub use provider::{FileHandle, FileProvider, FileTransferRequest};
pub use receiver::{ReceivedFileStorage, StoredFile};

use async_trait::async_trait;

use backend::azure::{AzureProvider, AzureReceivedFileStorage};
use backend::gcs::{GcsProvider, GcsReceivedFileStorage};
use backend::local::{LocalProvider, LocalReceivedFileStorage};
use backend::s3::{S3Provider, S3ReceivedFileStorage};

/// One configured storage backend, dispatching to the concrete
/// provider/receiver pair for its variant.
pub enum StorageBackend {
    Local(LocalProvider, LocalReceivedFileStorage),
    S3(S3Provider, S3ReceivedFileStorage),
    Azure(AzureProvider, AzureReceivedFileStorage),
    Gcs(GcsProvider, GcsReceivedFileStorage),
}

#[async_trait]
impl FileProvider for StorageBackend {
    async fn get(&self, request: &FileTransferRequest) -> Result<FileHandle, StorageError> {
        match self {
            StorageBackend::Local(p, _) => p.get(request).await,
            StorageBackend::S3(p, _) => p.get(request).await,
            StorageBackend::Azure(p, _) => p.get(request).await,
            StorageBackend::Gcs(p, _) => p.get(request).await,
        }
    }

    async fn validate_path(&self, request: &FileTransferRequest) -> Result<(), StorageError> {
        match self {
            StorageBackend::Local(p, _) => p.validate_path(request).await,
            StorageBackend::S3(p, _) => p.validate_path(request).await,
            StorageBackend::Azure(p, _) => p.validate_path(request).await,
            StorageBackend::Gcs(p, _) => p.validate_path(request).await,
        }
    }
}

#[async_trait]
impl ReceivedFileStorage for StorageBackend {
    async fn store(
        &self,
        local_file: &std::path::Path,
        original_name: &str,
        destination: &str,
    ) -> Result<StoredFile, StorageError> {
        match self {
            StorageBackend::Local(_, r) => r.store(local_file, original_name, destination).await,
            StorageBackend::S3(_, r) => r.store(local_file, original_name, destination).await,
            StorageBackend::Azure(_, r) => r.store(local_file, original_name, destination).await,
            StorageBackend::Gcs(_, r) => r.store(local_file, original_name, destination).await,
        }
    }
}
