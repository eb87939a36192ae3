//! Token verification against the IDP's JWKS endpoint. The JWK set is
//! fetched lazily and cached in memory for the process lifetime; a
//! production deployment would add periodic refresh, left as a
//! follow-up.

use std::collections::HashMap;
use std::sync::RwLock;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedClaims {
    pub azp: Option<String>,
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

pub struct TokenVerifier {
    jwks_url: String,
    http: reqwest::Client,
    cache: RwLock<HashMap<String, DecodingKey>>,
}

impl TokenVerifier {
    pub fn new(jwks_url: impl Into<String>, http: reqwest::Client) -> Self {
        TokenVerifier {
            jwks_url: jwks_url.into(),
            http,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn decoding_key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cache.read().unwrap().get(kid) {
            return Ok(key.clone());
        }
        let jwk_set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::VerificationFailed(format!("fetching JWKS: {e}")))?
            .json()
            .await
            .map_err(|e| AuthError::VerificationFailed(format!("parsing JWKS: {e}")))?;
        let mut cache = self.cache.write().unwrap();
        for jwk in jwk_set.keys {
            if let Ok(key) = DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                cache.insert(jwk.kid, key);
            }
        }
        cache
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::VerificationFailed(format!("no JWK found for kid {kid}")))
    }

    /// Validates the signature against the IDP's published JWKS and
    /// returns the decoded claims.
    pub async fn verify_token(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::VerificationFailed(format!("malformed header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::VerificationFailed("token header is missing kid".into()))?;
        let key = self.decoding_key_for(&kid).await?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        let data = decode::<VerifiedClaims>(token, &key, &validation)
            .map_err(|e| AuthError::VerificationFailed(e.to_string()))?;
        Ok(data.claims)
    }
}
