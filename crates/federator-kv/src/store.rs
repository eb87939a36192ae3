//! The `KvStore` contract: `get`/`set` plus the two typed offset
//! helpers. Reads and generic writes are best-effort — on backend
//! failure they degrade to a cache miss rather than raising — but
//! offset writes must either succeed or surface as a hard failure,
//! since they gate delivery progress.

use std::time::Duration;

use async_trait::async_trait;
use federator_types::ClientTopicOffset;

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("stored offset value `{0}` is not a valid integer")]
    MalformedOffset(String),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Best-effort read. Returns `None` on a real cache miss *or* on
    /// backend failure — both degrade to a cache miss without raising.
    async fn get(&self, key: &str) -> Option<String>;

    /// Best-effort write with an optional TTL. Failures are logged by
    /// the implementation and otherwise swallowed.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>);

    /// Typed offset read built on [`KvStore::get`].
    async fn get_offset(&self, client_id: &str, topic: &str) -> Option<i64> {
        let key = ClientTopicOffset::kv_key(client_id, topic);
        let raw = self.get(&key).await?;
        raw.parse().ok()
    }

    /// Typed offset write. Unlike [`KvStore::set`], failures are
    /// propagated: an offset write gates delivery progress and must
    /// either succeed or be surfaced as a hard failure.
    async fn set_offset(&self, client_id: &str, topic: &str, offset: i64) -> Result<(), KvError>;
}
