//! Token fetch: `fetch_token` reads the KV cache first, falls back to
//! a client-credentials grant against the IDP's token endpoint on a
//! miss, and writes the result back with a TTL equal to `expires_in`.
//!
//! Wraps a `reqwest::Client` behind a typed config, including the
//! mTLS identity path.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use federator_kv::KvStore;
use federator_types::CachedToken;
use serde::Deserialize;
use tracing::{info, warn};

use crate::circuit::CircuitBreaker;
use crate::config::IdpConfig;
use crate::error::AuthError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Builds the `reqwest::Client` used to reach the IDP, attaching a
/// client certificate identity when `idp.mtls.enabled` is set.
pub fn build_http_client(config: &IdpConfig) -> Result<reqwest::Client, AuthError> {
    let mut builder = reqwest::Client::builder();
    if config.uses_mtls() {
        let keystore_path = config
            .keystore_path
            .as_deref()
            .ok_or_else(|| AuthError::TokenRequest("idp.mtls.enabled but no keystore configured".into()))?;
        let bytes = fs::read(keystore_path)
            .map_err(|e| AuthError::TokenRequest(format!("reading keystore {keystore_path}: {e}")))?;
        let password = config.keystore_password.as_deref().unwrap_or("");
        let identity = reqwest::Identity::from_pkcs12_der(&bytes, password)
            .map_err(|e| AuthError::TokenRequest(format!("invalid keystore: {e}")))?;
        builder = builder.identity(identity);
    }
    builder
        .build()
        .map_err(|e| AuthError::TokenRequest(format!("building HTTP client: {e}")))
}

pub struct TokenService {
    config: IdpConfig,
    http: reqwest::Client,
    kv: Arc<dyn KvStore>,
    circuit: CircuitBreaker,
}

impl TokenService {
    pub fn new(config: IdpConfig, http: reqwest::Client, kv: Arc<dyn KvStore>) -> Self {
        TokenService {
            config,
            http,
            kv,
            circuit: CircuitBreaker::new(5, Duration::from_secs(30)),
        }
    }

    /// Reads the KV cache first, fetches on miss, writes back with a TTL.
    pub async fn fetch_token(&self, management_node_id: &str) -> Result<String, AuthError> {
        let key = CachedToken::kv_key(management_node_id);
        if let Some(cached) = self.kv.get(&key).await {
            if let Ok(cached) = serde_json::from_str::<CachedToken>(&cached) {
                if !cached.is_expired(Utc::now()) {
                    return Ok(cached.token);
                }
            }
        }

        if !self.circuit.allow_request() {
            return Err(AuthError::CircuitOpen { tripped_at: Utc::now() });
        }

        let attempt = backoff::future::retry(backoff::ExponentialBackoff::default(), || async {
            self.request_token().await.map_err(backoff::Error::transient)
        })
        .await;

        match attempt {
            Ok(response) => {
                self.circuit.record_success();
                let cached = CachedToken {
                    token: response.access_token.clone(),
                    expires_at: Utc::now() + chrono::Duration::seconds(response.expires_in),
                };
                let ttl = Duration::from_secs(response.expires_in.max(0) as u64);
                self.kv
                    .set(&key, &serde_json::to_string(&cached).unwrap(), Some(ttl))
                    .await;
                info!(management_node_id, "fetched fresh IDP token");
                Ok(cached.token)
            }
            Err(e) => {
                self.circuit.record_failure();
                warn!(management_node_id, error = %e, "IDP token fetch failed");
                Err(e)
            }
        }
    }

    async fn request_token(&self) -> Result<TokenResponse, AuthError> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::TokenRequest(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::TokenRequest(format!(
                "IDP returned status {}",
                response.status()
            )));
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use federator_kv::InMemoryKv;

    fn config() -> IdpConfig {
        IdpConfig {
            token_url: "http://127.0.0.1:0/token".into(),
            jwks_url: "http://127.0.0.1:0/jwks".into(),
            client_id: "federator-server".into(),
            client_secret: Some("s3cr3t".into()),
            mtls_enabled: false,
            keystore_path: None,
            keystore_password: None,
            truststore_path: None,
        }
    }

    #[tokio::test]
    async fn cached_token_is_returned_without_a_network_call() {
        let kv = Arc::new(InMemoryKv::new());
        let cached = CachedToken {
            token: "cached-token".into(),
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        };
        kv.set(
            &CachedToken::kv_key("default"),
            &serde_json::to_string(&cached).unwrap(),
            None,
        )
        .await;
        let service = TokenService::new(config(), reqwest::Client::new(), kv);
        let token = service.fetch_token("default").await.unwrap();
        assert_eq!(token, "cached-token");
    }
}
