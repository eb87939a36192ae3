//! The client-side job scheduler: a durable recurring job registry
//! reconciled per management node.

pub mod backend;
pub mod error;
pub mod scheduler;

pub use backend::{JobHandle, MockSchedulerBackend, SchedulerBackend, TokioSchedulerBackend, WorkerFn};
pub use error::SchedulerError;
pub use scheduler::Scheduler;
