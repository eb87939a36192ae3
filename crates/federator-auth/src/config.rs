//! Auth configuration: the `idp.*` configuration surface.

use serde::Deserialize;

/// Selects between the two grant variants: client-secret and mTLS
/// client certificate. Selected by the single `idp.mtls.enabled`
/// boolean.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpConfig {
    pub token_url: String,
    pub jwks_url: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub mtls_enabled: bool,
    #[serde(default)]
    pub keystore_path: Option<String>,
    #[serde(default)]
    pub keystore_password: Option<String>,
    #[serde(default)]
    pub truststore_path: Option<String>,
}

impl IdpConfig {
    pub fn uses_mtls(&self) -> bool {
        self.mtls_enabled
    }
}
