//! File Chunk Producer: reads a source file through a [`FileProvider`]
//! and emits a sequence of `FileChunkFrame`s, hashing incrementally so
//! the last frame can carry the whole-file checksum without a second
//! read pass.

use std::future::Future;

use federator_proto::{file_stream_item, FileChunkFrame, FileStreamItem, Warning};
use federator_storage::key::sanitize;
use federator_storage::{FileProvider, FileTransferRequest};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

fn chunk_item(frame: FileChunkFrame) -> FileStreamItem {
    FileStreamItem {
        item: Some(file_stream_item::Item::Chunk(frame)),
    }
}

fn warning_item(reason: impl Into<String>, details: impl Into<String>, skipped_sequence_id: i64) -> FileStreamItem {
    FileStreamItem {
        item: Some(file_stream_item::Item::Warning(Warning {
            reason: reason.into(),
            details: details.into(),
            skipped_sequence_id,
        })),
    }
}

/// Streams `request` as chunk frames through `emit`, one frame at a
/// time, so the caller (normally a flow-controlled sender) applies its
/// own backpressure between chunks.
///
/// A `FileProvider` failure is reported as a single warning control
/// frame rather than failing the whole RPC stream; the same treatment
/// is extended here to a read failure that happens mid-file, since by
/// that point the stream has already committed to a `file_sequence_id`
/// and must not leave the receiver waiting on a commit marker that
/// will never arrive.
pub async fn produce_chunks<F, Fut>(
    provider: &dyn FileProvider,
    request: &FileTransferRequest,
    file_sequence_id: i64,
    chunk_size: usize,
    mut emit: F,
) -> Result<(), tonic::Status>
where
    F: FnMut(FileStreamItem) -> Fut,
    Fut: Future<Output = Result<(), tonic::Status>>,
{
    let handle = match provider.get(request).await {
        Ok(handle) => handle,
        Err(e) => {
            return emit(warning_item(e.to_string(), request.path.clone(), file_sequence_id)).await;
        }
    };

    let file_name = sanitize(&request.path);
    let file_size = handle.size;
    let total_chunks = if file_size == 0 {
        1
    } else {
        ((file_size + chunk_size as u64 - 1) / chunk_size as u64) as u32
    };

    let mut reader = handle.stream;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size];
    let mut chunk_index: u32 = 0;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                return emit(warning_item(e.to_string(), request.path.clone(), file_sequence_id)).await;
            }
        };
        hasher.update(&buf[..n]);
        emit(chunk_item(FileChunkFrame {
            file_name: file_name.clone(),
            file_sequence_id,
            chunk_index,
            total_chunks,
            is_last_chunk: false,
            file_size,
            file_checksum: String::new(),
            chunk_data: buf[..n].to_vec(),
        }))
        .await?;
        chunk_index += 1;
    }

    let checksum = hex::encode(hasher.finalize());
    emit(chunk_item(FileChunkFrame {
        file_name,
        file_sequence_id,
        chunk_index,
        total_chunks,
        is_last_chunk: true,
        file_size,
        file_checksum: checksum,
        chunk_data: Vec::new(),
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use federator_storage::{FileHandle, StorageError};

    struct StaticProvider {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl FileProvider for StaticProvider {
        async fn get(&self, _request: &FileTransferRequest) -> Result<FileHandle, StorageError> {
            Ok(FileHandle {
                size: self.bytes.len() as u64,
                stream: Box::pin(std::io::Cursor::new(self.bytes.clone())),
            })
        }

        async fn validate_path(&self, _request: &FileTransferRequest) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl FileProvider for FailingProvider {
        async fn get(&self, request: &FileTransferRequest) -> Result<FileHandle, StorageError> {
            Err(StorageError::NotFound(request.path.clone()))
        }

        async fn validate_path(&self, request: &FileTransferRequest) -> Result<(), StorageError> {
            Err(StorageError::NotFound(request.path.clone()))
        }
    }

    fn request() -> FileTransferRequest {
        FileTransferRequest {
            storage_container: "bucket".into(),
            path: "reports/out.csv".into(),
        }
    }

    #[tokio::test]
    async fn small_file_produces_one_data_frame_and_one_commit_frame() {
        let provider = StaticProvider { bytes: b"Hello ".to_vec() };
        let mut items = Vec::new();
        produce_chunks(&provider, &request(), 42, DEFAULT_CHUNK_SIZE, |item| {
            items.push(item);
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 2);
        let data = match &items[0].item {
            Some(file_stream_item::Item::Chunk(c)) => c,
            other => panic!("expected chunk, got {other:?}"),
        };
        assert_eq!(data.chunk_data, b"Hello ");
        assert!(!data.is_last_chunk);

        let commit = match &items[1].item {
            Some(file_stream_item::Item::Chunk(c)) => c,
            other => panic!("expected chunk, got {other:?}"),
        };
        assert!(commit.is_last_chunk);
        assert!(commit.chunk_data.is_empty());
        assert_eq!(
            commit.file_checksum,
            hex::encode(Sha256::digest(b"Hello "))
        );
    }

    #[tokio::test]
    async fn empty_file_produces_a_single_zero_size_commit_frame() {
        let provider = StaticProvider { bytes: Vec::new() };
        let mut items = Vec::new();
        produce_chunks(&provider, &request(), 7, DEFAULT_CHUNK_SIZE, |item| {
            items.push(item);
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 1);
        let commit = match &items[0].item {
            Some(file_stream_item::Item::Chunk(c)) => c,
            other => panic!("expected chunk, got {other:?}"),
        };
        assert!(commit.is_last_chunk);
        assert_eq!(commit.file_size, 0);
        assert_eq!(commit.file_checksum, hex::encode(Sha256::digest(b"")));
    }

    #[tokio::test]
    async fn provider_failure_emits_a_single_warning_and_no_chunks() {
        let provider = FailingProvider;
        let mut items = Vec::new();
        produce_chunks(&provider, &request(), 3, DEFAULT_CHUNK_SIZE, |item| {
            items.push(item);
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0].item,
            Some(file_stream_item::Item::Warning(_))
        ));
    }

    #[tokio::test]
    async fn large_file_splits_into_expected_chunk_count() {
        let bytes = vec![7u8; 25];
        let provider = StaticProvider { bytes };
        let mut items = Vec::new();
        produce_chunks(&provider, &request(), 1, 10, |item| {
            items.push(item);
            async { Ok(()) }
        })
        .await
        .unwrap();

        // 25 bytes / 10-byte chunks => 3 data frames + 1 commit frame.
        assert_eq!(items.len(), 4);
        for item in &items[..3] {
            match &item.item {
                Some(file_stream_item::Item::Chunk(c)) => assert_eq!(c.total_chunks, 3),
                other => panic!("expected chunk, got {other:?}"),
            }
        }
    }
}
