//! Local filesystem `FileProvider`/`ReceivedFileStorage`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;

use crate::error::StorageError;
use crate::key::{delete_local_temp_quietly, sanitize};
use crate::provider::{FileHandle, FileProvider, FileTransferRequest};
use crate::receiver::{ReceivedFileStorage, StoredFile};

pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalProvider { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl FileProvider for LocalProvider {
    async fn get(&self, request: &FileTransferRequest) -> Result<FileHandle, StorageError> {
        let full_path = self.resolve(&request.path);
        let metadata = tokio::fs::metadata(&full_path)
            .await
            .map_err(|_| StorageError::NotFound(request.path.clone()))?;
        if !metadata.is_file() {
            return Err(StorageError::NotAFile(request.path.clone()));
        }
        let file = File::open(&full_path)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(FileHandle {
            stream: Box::pin(file),
            size: metadata.len(),
        })
    }

    async fn validate_path(&self, request: &FileTransferRequest) -> Result<(), StorageError> {
        let full_path = self.resolve(&request.path);
        let metadata = tokio::fs::metadata(&full_path)
            .await
            .map_err(|_| StorageError::NotFound(request.path.clone()))?;
        if !metadata.is_file() {
            return Err(StorageError::NotAFile(request.path.clone()));
        }
        Ok(())
    }
}

pub struct LocalReceivedFileStorage;

#[async_trait]
impl ReceivedFileStorage for LocalReceivedFileStorage {
    async fn store(
        &self,
        local_file: &Path,
        original_name: &str,
        destination: &str,
    ) -> Result<StoredFile, StorageError> {
        let target = if destination.ends_with('/') {
            Path::new(destination).join(sanitize(original_name))
        } else {
            PathBuf::from(destination)
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        match tokio::fs::rename(local_file, &target).await {
            Ok(()) => {}
            Err(_) => {
                // Atomic rename rejected (e.g. cross-device); fall back to
                // a non-atomic copy + delete.
                tokio::fs::copy(local_file, &target)
                    .await
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                delete_local_temp_quietly(local_file).await;
            }
        }
        let absolute = tokio::fs::canonicalize(&target)
            .await
            .unwrap_or(target.clone());
        Ok(StoredFile {
            local_path: Some(absolute),
            remote_uri: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn store_to_directory_destination_uses_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let temp_path = dir.path().join("incoming.part");
        let mut file = File::create(&temp_path).await.unwrap();
        file.write_all(b"hello").await.unwrap();
        drop(file);

        let storage = LocalReceivedFileStorage;
        let destination = format!("{}/", dir.path().join("out").display());
        let stored = storage
            .store(&temp_path, "../evil/report.csv", &destination)
            .await
            .unwrap();
        let local_path = stored.local_path.unwrap();
        assert_eq!(local_path.file_name().unwrap(), "report.csv");
        assert_eq!(tokio::fs::read(&local_path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn store_to_full_path_destination_uses_that_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        let temp_path = dir.path().join("incoming.part");
        tokio::fs::write(&temp_path, b"data").await.unwrap();

        let storage = LocalReceivedFileStorage;
        let destination = dir.path().join("final.bin");
        let stored = storage
            .store(&temp_path, "original.bin", destination.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(stored.local_path.unwrap().file_name().unwrap(), "final.bin");
    }

    #[tokio::test]
    async fn validate_path_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalProvider::new(dir.path());
        let request = FileTransferRequest {
            storage_container: String::new(),
            path: "missing.csv".into(),
        };
        assert!(matches!(
            provider.validate_path(&request).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
