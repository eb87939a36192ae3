//! In-process [`KvStore`] used by tests and by the `federator-client`/
//! `federator-server` binaries' own unit tests; never used in
//! production (redis is the durable backend).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use federator_types::ClientTopicOffset;
use tokio::sync::Mutex;

use crate::store::{KvError, KvStore};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct InMemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at.map_or(true, |at| at > Instant::now()) => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    async fn set_offset(&self, client_id: &str, topic: &str, offset: i64) -> Result<(), KvError> {
        let key = ClientTopicOffset::kv_key(client_id, topic);
        self.set(&key, &offset.to_string(), None).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offset_round_trips() {
        let kv = InMemoryKv::new();
        kv.set_offset("consumer-a", "orders.v1", 43).await.unwrap();
        assert_eq!(kv.get_offset("consumer-a", "orders.v1").await, Some(43));
    }

    #[tokio::test]
    async fn missing_key_is_a_clean_miss() {
        let kv = InMemoryKv::new();
        assert_eq!(kv.get_offset("nobody", "nothing").await, None);
    }

    #[tokio::test]
    async fn ttl_expiry_is_a_miss_after_elapsed() {
        let kv = InMemoryKv::new();
        kv.set("k", "v", Some(Duration::from_millis(10))).await;
        assert_eq!(kv.get("k").await, Some("v".to_string()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(kv.get("k").await, None);
    }
}
