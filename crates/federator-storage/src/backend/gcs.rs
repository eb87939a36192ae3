//! Google Cloud Storage `FileProvider`/`ReceivedFileStorage`, built on
//! `google-cloud-storage`.

use std::path::Path;

use async_trait::async_trait;
use futures::TryStreamExt;
use google_cloud_storage::client::Client;
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use tokio_util::io::StreamReader;

use crate::error::StorageError;
use crate::key::{delete_local_temp_quietly, resolve_key};
use crate::provider::{FileHandle, FileProvider, FileTransferRequest};
use crate::receiver::{ReceivedFileStorage, StoredFile};

pub struct GcsProvider {
    client: Client,
    bucket: String,
}

impl GcsProvider {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        GcsProvider { client, bucket: bucket.into() }
    }

    fn get_request(&self, path: &str) -> GetObjectRequest {
        GetObjectRequest {
            bucket: self.bucket.clone(),
            object: path.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl FileProvider for GcsProvider {
    async fn get(&self, request: &FileTransferRequest) -> Result<FileHandle, StorageError> {
        let metadata = self
            .client
            .get_object(&self.get_request(&request.path))
            .await
            .map_err(|_| StorageError::NotFound(request.path.clone()))?;

        let stream = self
            .client
            .download_streamed_object(&self.get_request(&request.path), &Range::default())
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        Ok(FileHandle {
            stream: Box::pin(StreamReader::new(stream)),
            size: metadata.size.max(0) as u64,
        })
    }

    async fn validate_path(&self, request: &FileTransferRequest) -> Result<(), StorageError> {
        self.client
            .get_object(&self.get_request(&request.path))
            .await
            .map(|_| ())
            .map_err(|_| StorageError::NotFound(request.path.clone()))
    }
}

pub struct GcsReceivedFileStorage {
    client: Client,
    bucket: String,
}

impl GcsReceivedFileStorage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        GcsReceivedFileStorage { client, bucket: bucket.into() }
    }
}

#[async_trait]
impl ReceivedFileStorage for GcsReceivedFileStorage {
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
            .client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                bytes,
                &UploadType::Simple(Media::new(key.clone())),
            )
            .await;
        delete_local_temp_quietly(local_file).await;
        match result {
            Ok(_) => Ok(StoredFile {
                local_path: None,
                remote_uri: Some(format!("gs://{}/{}", self.bucket, key)),
            }),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }
}
