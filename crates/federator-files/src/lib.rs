//! The chunked file transfer engine: splits a source file into framed
//! chunks with per-chunk and whole-file integrity on the producer
//! side, and reassembles them atomically on the receiver side.

pub mod assembler;
pub mod error;
pub mod producer;

pub use assembler::FileChunkAssembler;
pub use error::AssemblyError;
pub use producer::{produce_chunks, DEFAULT_CHUNK_SIZE};
