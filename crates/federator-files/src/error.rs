//! Error taxonomy for the file chunk assembler.

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("missing chunk frame on file stream")]
    MissingFrame,
    #[error("temp file io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] federator_storage::StorageError),
}
