//! S3-backed `FileProvider`/`ReceivedFileStorage`, built on
//! `aws-sdk-s3`.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::error::StorageError;
use crate::key::{delete_local_temp_quietly, resolve_key};
use crate::provider::{FileHandle, FileProvider, FileTransferRequest};
use crate::receiver::{ReceivedFileStorage, StoredFile};

pub struct S3Provider {
    client: Client,
    bucket: String,
}

impl S3Provider {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        S3Provider { client, bucket: bucket.into() }
    }
}

#[async_trait]
impl FileProvider for S3Provider {
    async fn get(&self, request: &FileTransferRequest) -> Result<FileHandle, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&request.path)
            .send()
            .await
            .map_err(|e| match e.code() {
                Some("NoSuchKey") => StorageError::NotFound(request.path.clone()),
                _ => StorageError::Backend(e.to_string()),
            })?;
        let size = output.content_length().unwrap_or(0).max(0) as u64;
        let reader = output.body.into_async_read();
        Ok(FileHandle {
            stream: Box::pin(reader),
            size,
        })
    }

    async fn validate_path(&self, request: &FileTransferRequest) -> Result<(), StorageError> {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(&request.path)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| match e.code() {
                Some("NotFound") => StorageError::NotFound(request.path.clone()),
                _ => StorageError::Backend(e.to_string()),
            })
    }
}

pub struct S3ReceivedFileStorage {
    client: Client,
    bucket: String,
}

impl S3ReceivedFileStorage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        S3ReceivedFileStorage { client, bucket: bucket.into() }
    }
}

#[async_trait]
impl ReceivedFileStorage for S3ReceivedFileStorage {
    async fn store(
        &self,
        local_file: &Path,
        original_name: &str,
        destination: &str,
    ) -> Result<StoredFile, StorageError> {
        let key = resolve_key(destination, original_name);
        let body = ByteStream::from_path(local_file)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await;
        // The temp file is always removed once its bytes have left the
        // process, success or failure; only a success yields a remote
        // URI, so the offset gate in the caller holds.
        delete_local_temp_quietly(local_file).await;
        match result {
            Ok(_) => Ok(StoredFile {
                local_path: None,
                remote_uri: Some(format!("s3://{}/{}", self.bucket, key)),
            }),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }
}
