//! Azure Blob Storage `FileProvider`/`ReceivedFileStorage`, built on
//! `azure_storage_blobs`.

use std::path::Path;

use async_trait::async_trait;
use azure_storage_blobs::prelude::ContainerClient;
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use crate::error::StorageError;
use crate::key::{delete_local_temp_quietly, resolve_key};
use crate::provider::{FileHandle, FileProvider, FileTransferRequest};
use crate::receiver::{ReceivedFileStorage, StoredFile};

pub struct AzureProvider {
    container: ContainerClient,
}

impl AzureProvider {
    pub fn new(container: ContainerClient) -> Self {
        AzureProvider { container }
    }
}

#[async_trait]
impl FileProvider for AzureProvider {
    async fn get(&self, request: &FileTransferRequest) -> Result<FileHandle, StorageError> {
        let blob = self.container.blob_client(&request.path);
        let properties = blob
            .get_properties()
            .await
            .map_err(|_| StorageError::NotFound(request.path.clone()))?;
        let size = properties.blob.properties.content_length;

        let stream = blob
            .get()
            .into_stream()
            .map_ok(|chunk| chunk.data)
            .try_flatten()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        Ok(FileHandle {
            stream: Box::pin(StreamReader::new(stream)),
            size,
        })
    }

    async fn validate_path(&self, request: &FileTransferRequest) -> Result<(), StorageError> {
        let exists = self
            .container
            .blob_client(&request.path)
            .exists()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if exists {
            Ok(())
        } else {
            Err(StorageError::NotFound(request.path.clone()))
        }
    }
}

pub struct AzureReceivedFileStorage {
    container: ContainerClient,
    container_name: String,
}

impl AzureReceivedFileStorage {
    pub fn new(container: ContainerClient, container_name: impl Into<String>) -> Self {
        AzureReceivedFileStorage {
            container,
            container_name: container_name.into(),
        }
    }
}

#[async_trait]
impl ReceivedFileStorage for AzureReceivedFileStorage {
    async fn store(
        &self,
        local_file: &Path,
        original_name: &str,
        destination: &str,
    ) -> Result<StoredFile, StorageError> {
        let key = resolve_key(destination, original_name);
        let bytes = tokio::fs::read(local_file)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let result = self
            .container
            .blob_client(&key)
            .put_block_blob(bytes)
            .await;
        delete_local_temp_quietly(local_file).await;
        match result {
            Ok(_) => Ok(StoredFile {
                local_path: None,
                remote_uri: Some(format!("azure://{}/{}", self.container_name, key)),
            }),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }
}
