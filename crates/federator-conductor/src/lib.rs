//! The Message Conductor: drives one topic's event flow for one
//! `StreamEvents` call.

pub mod conductor;
pub mod error;
pub mod transform;

pub use conductor::{ConductorConfig, ConductorState, MessageConductor};
pub use error::ConductorError;
