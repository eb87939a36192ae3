//! File Chunk Assembler: turns a sequence of `FileChunkFrame`s into
//! exactly one published file, or fails loudly with the temp file
//! removed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use federator_proto::{file_stream_item, FileChunkFrame, FileStreamItem};
use federator_storage::key::{delete_local_temp_quietly, sanitize};
use federator_storage::{ReceivedFileStorage, StoredFile};
use sha2::{Digest, Sha256};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::AssemblyError;

/// Per-`(file_name, file_sequence_id)` accumulation state, valid for
/// the lifetime of one in-flight file.
struct AssemblyContext {
    temp_path: PathBuf,
    file: File,
    hasher: Sha256,
    bytes_written: u64,
}

/// Single-writer-per-key append-only reassembly keyed on
/// `(file_name, file_sequence_id)`.
pub struct FileChunkAssembler {
    temp_dir: PathBuf,
    storage: Arc<dyn ReceivedFileStorage>,
    destination: String,
    contexts: Mutex<HashMap<(String, i64), AssemblyContext>>,
}

impl FileChunkAssembler {
    pub fn new(
        temp_dir: impl Into<PathBuf>,
        storage: Arc<dyn ReceivedFileStorage>,
        destination: impl Into<String>,
    ) -> Self {
        FileChunkAssembler {
            temp_dir: temp_dir.into(),
            storage,
            destination: destination.into(),
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Unwraps a `FileStreamItem` into its chunk frame, rejecting a
    /// warning or an empty oneof at this boundary: callers must not
    /// pass a missing chunk through.
    pub fn chunk_from_item(item: FileStreamItem) -> Result<Option<FileChunkFrame>, AssemblyError> {
        match item.item {
            Some(file_stream_item::Item::Chunk(frame)) => Ok(Some(frame)),
            Some(file_stream_item::Item::Warning(w)) => {
                warn!(reason = %w.reason, skipped = w.skipped_sequence_id, "producer skipped a file transfer request");
                Ok(None)
            }
            None => Err(AssemblyError::MissingFrame),
        }
    }

    /// Appends or commits `frame`. Returns `Some(StoredFile)` once the
    /// last chunk of a file has been validated and published; `None`
    /// while still accumulating a non-last chunk.
    pub async fn handle_chunk(
        &self,
        frame: FileChunkFrame,
    ) -> Result<Option<StoredFile>, AssemblyError> {
        let sanitized_name = sanitize(&frame.file_name);
        let key = (sanitized_name.clone(), frame.file_sequence_id);

        let mut contexts = self.contexts.lock().await;
        if !contexts.contains_key(&key) {
            let parts_dir = self.temp_dir.join(".parts");
            tokio::fs::create_dir_all(&parts_dir).await?;
            let temp_path =
                parts_dir.join(format!("{}.{}.part", sanitized_name, frame.file_sequence_id));
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)
                .await?;
            contexts.insert(
                key.clone(),
                AssemblyContext {
                    temp_path,
                    file,
                    hasher: Sha256::new(),
                    bytes_written: 0,
                },
            );
        }

        if !frame.is_last_chunk {
            let ctx = contexts.get_mut(&key).expect("context inserted above");
            ctx.file.write_all(&frame.chunk_data).await?;
            ctx.hasher.update(&frame.chunk_data);
            ctx.bytes_written += frame.chunk_data.len() as u64;
            return Ok(None);
        }

        let ctx = contexts.remove(&key).expect("context inserted above");
        drop(contexts);

        let AssemblyContext {
            temp_path,
            mut file,
            hasher,
            bytes_written,
        } = ctx;
        file.flush().await?;
        drop(file);

        if bytes_written != frame.file_size {
            delete_local_temp_quietly(&temp_path).await;
            return Err(AssemblyError::SizeMismatch {
                expected: frame.file_size,
                actual: bytes_written,
            });
        }

        if !frame.file_checksum.is_empty() {
            let digest = hex::encode(hasher.finalize());
            if digest != frame.file_checksum {
                delete_local_temp_quietly(&temp_path).await;
                return Err(AssemblyError::ChecksumMismatch);
            }
        }

        let stored = self
            .storage
            .store(&temp_path, &sanitized_name, &self.destination)
            .await?;
        Ok(Some(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use federator_storage::backend::local::LocalReceivedFileStorage;
    use sha2::Digest as _;

    fn frame(name: &str, seq: i64, index: u32, total: u32, data: &[u8], last: bool, size: u64, checksum: &str) -> FileChunkFrame {
        FileChunkFrame {
            file_name: name.into(),
            file_sequence_id: seq,
            chunk_index: index,
            total_chunks: total,
            is_last_chunk: last,
            file_size: size,
            file_checksum: checksum.into(),
            chunk_data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn small_file_round_trips_bytes_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let destination = format!("{}/", dir.path().join("out").display());
        let assembler = FileChunkAssembler::new(
            dir.path(),
            Arc::new(LocalReceivedFileStorage),
            destination,
        );

        let checksum = hex::encode(Sha256::digest(b"Hello "));
        let result = assembler
            .handle_chunk(frame("report.csv", 1, 0, 2, b"Hello ", false, 6, ""))
            .await
            .unwrap();
        assert!(result.is_none());

        let result = assembler
            .handle_chunk(frame("report.csv", 1, 1, 2, b"", true, 6, &checksum))
            .await
            .unwrap()
            .expect("last chunk publishes");
        let path = result.local_path.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"Hello ");
    }

    #[tokio::test]
    async fn empty_file_publishes_a_zero_byte_file() {
        let dir = tempfile::tempdir().unwrap();
        let destination = format!("{}/", dir.path().join("out").display());
        let assembler = FileChunkAssembler::new(
            dir.path(),
            Arc::new(LocalReceivedFileStorage),
            destination,
        );

        let checksum = hex::encode(Sha256::digest(b""));
        let result = assembler
            .handle_chunk(frame("empty.bin", 9, 0, 1, b"", true, 0, &checksum))
            .await
            .unwrap()
            .expect("single last chunk publishes");
        let path = result.local_path.unwrap();
        assert_eq!(tokio::fs::metadata(&path).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn size_mismatch_deletes_temp_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let destination = format!("{}/", dir.path().join("out").display());
        let assembler = FileChunkAssembler::new(
            dir.path(),
            Arc::new(LocalReceivedFileStorage),
            destination,
        );

        assembler
            .handle_chunk(frame("report.csv", 2, 0, 2, b"Hello ", false, 6, ""))
            .await
            .unwrap();
        let err = assembler
            .handle_chunk(frame("report.csv", 2, 1, 2, b"", true, 99, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::SizeMismatch { expected: 99, actual: 6 }));

        let parts_dir = dir.path().join(".parts");
        let mut entries = tokio::fs::read_dir(&parts_dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn checksum_mismatch_deletes_temp_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let destination = format!("{}/", dir.path().join("out").display());
        let assembler = FileChunkAssembler::new(
            dir.path(),
            Arc::new(LocalReceivedFileStorage),
            destination,
        );

        assembler
            .handle_chunk(frame("report.csv", 3, 0, 2, b"Hello ", false, 6, ""))
            .await
            .unwrap();
        let err = assembler
            .handle_chunk(frame("report.csv", 3, 1, 2, b"", true, 6, "deadbeef"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::ChecksumMismatch));

        let parts_dir = dir.path().join(".parts");
        let mut entries = tokio::fs::read_dir(&parts_dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[test]
    fn chunk_from_item_rejects_an_empty_oneof() {
        let item = FileStreamItem { item: None };
        assert!(matches!(
            FileChunkAssembler::chunk_from_item(item),
            Err(AssemblyError::MissingFrame)
        ));
    }
}
