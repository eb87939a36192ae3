//! Redis-backed [`KvStore`], configured off the `redis.*` configuration
//! surface.

use std::time::Duration;

use async_trait::async_trait;
use federator_types::ClientTopicOffset;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

use crate::store::{KvError, KvStore};

pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub async fn connect(redis_url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(redis_url).map_err(|e| KvError::Backend(e.to_string()))?;
        let conn = client
            .get_tokio_connection_manager()
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(RedisKv { conn })
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "redis read failed, degrading to cache miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let mut conn = self.conn.clone();
        let result = match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await,
            None => conn.set::<_, _, ()>(key, value).await,
        };
        if let Err(e) = result {
            warn!(error = %e, key, "redis write failed, value not cached");
        }
    }

    async fn set_offset(&self, client_id: &str, topic: &str, offset: i64) -> Result<(), KvError> {
        let key = ClientTopicOffset::kv_key(client_id, topic);
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(&key, offset.to_string())
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }
}
