//! Offset and token key-value store.
//!
//! A small cache of lazily constructed, shared backend connections
//! keyed by location/URI, guarded by a `Mutex`/`RwLock`-keyed map
//! rather than any global mutable state.

pub mod memory;
pub mod redis_store;
pub mod store;

pub use memory::InMemoryKv;
pub use redis_store::RedisKv;
pub use store::{KvError, KvStore};
