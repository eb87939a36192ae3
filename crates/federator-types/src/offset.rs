//! Client topic offsets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTopicOffset {
    pub next_offset: i64,
}

impl ClientTopicOffset {
    /// The KV key layout: `topic:{consumer_id}-{topic}:offset`.
    pub fn kv_key(consumer_id: &str, topic: &str) -> String {
        format!("topic:{consumer_id}-{topic}:offset")
    }

    /// Offset to persist after `delivered_offset` has been durably
    /// handed off downstream.
    pub fn advanced_from(delivered_offset: i64) -> ClientTopicOffset {
        ClientTopicOffset {
            next_offset: delivered_offset + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_key_matches_fixed_layout() {
        assert_eq!(
            ClientTopicOffset::kv_key("consumer-a", "orders.v1"),
            "topic:consumer-a-orders.v1:offset"
        );
    }

    #[test]
    fn advance_is_delivered_plus_one() {
        assert_eq!(ClientTopicOffset::advanced_from(42).next_offset, 43);
    }
}
