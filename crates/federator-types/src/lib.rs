//! Domain types for the federation gateway: producer/consumer
//! configuration, recurring jobs, offsets, cached tokens, and the
//! transient file-assembly context.
//!
//! These types sit one layer above the wire schema in
//! `federator-proto`: they are the in-process representation that
//! other crates (`federator-conductor`, `federator-scheduler`, ...)
//! operate on.

pub mod config;
pub mod job;
pub mod offset;
pub mod token;

pub use config::{AttributesDTO, Consumer, Producer, ProducerConfig, Product};
pub use job::{JobSchedule, RecurringJob};
pub use offset::ClientTopicOffset;
pub use token::CachedToken;

/// Sentinel used wherever the management-node id is optional in one
/// call path and required in another; resolved to a single non-null
/// id parameter throughout.
pub const DEFAULT_MANAGEMENT_NODE_ID: &str = "default";
