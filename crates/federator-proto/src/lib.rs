//! Generated wire types for the `federator.v1` gRPC service.
//!
//! The `.proto` file is the bit-exact wire contract; field numbers
//! must not change without a deliberate migration.

#![allow(clippy::derive_partial_eq_without_eq)]

tonic::include_proto!("federator.v1");
