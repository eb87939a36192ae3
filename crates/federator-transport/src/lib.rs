//! RPC transport layer: auth interceptors, the flow-controlled
//! sender, and the retryability taxonomy.

pub mod auth;
pub mod retry;
pub mod sender;

pub use auth::{AuthenticatedClient, BearerTokenInterceptor, ServerAuthInterceptor};
pub use retry::{classify, Retryability};
pub use sender::{FlowControlledSender, DEFAULT_STALL_DEADLINE};
