//! Storage backend implementations.
//!
//! Each backend module provides a concrete type that implements
//! [`CsiIdentity`](crate::CsiIdentity) and [`CsiNode`](crate::CsiNode).

pub mod ephemeral;

pub use ephemeral::EphemeralBackend;
