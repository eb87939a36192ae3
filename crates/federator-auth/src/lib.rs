//! Auth / identity: token fetch (client-secret or mTLS), verification,
//! and the retry/circuit-breaker resilience wrapping both.

pub mod circuit;
pub mod config;
pub mod error;
pub mod token;
pub mod verify;

pub use circuit::CircuitBreaker;
pub use config::IdpConfig;
pub use error::AuthError;
pub use token::{build_http_client, TokenService};
pub use verify::{TokenVerifier, VerifiedClaims};
