//! Error taxonomy for auth/identity operations.

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("IDP token request failed: {0}")]
    TokenRequest(String),
    #[error("IDP response was malformed: {0}")]
    MalformedResponse(String),
    #[error("token verification failed: {0}")]
    VerificationFailed(String),
    /// Surfaced when the circuit breaker is open.
    #[error("circuit breaker open for IDP calls, tripped at {tripped_at}")]
    CircuitOpen { tripped_at: chrono::DateTime<chrono::Utc> },
    #[error("kv store error: {0}")]
    Kv(#[from] federator_kv::KvError),
}
