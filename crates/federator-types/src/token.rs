//! Cached IDP tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// KV key layout: `management_node_{id}_access_token`.
    pub fn kv_key(management_node_id: &str) -> String {
        format!("management_node_{management_node_id}_access_token")
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn kv_key_matches_fixed_layout() {
        assert_eq!(CachedToken::kv_key("default"), "management_node_default_access_token");
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let token = CachedToken {
            token: "t".into(),
            expires_at: now - Duration::seconds(1),
        };
        assert!(token.is_expired(now));
    }
}
