//! # libcsi - ephemeral inline CSI node plugin
//!
//! `libcsi` implements a small [Container Storage Interface][csi] node plugin
//! that hands the Network Service Mesh API socket directory to workloads as
//! an inline ephemeral volume.  Every accepted publish request bind-mounts
//! that single host directory at the requested target path.  It follows the
//! RK8s conventions (Tokio async runtime, `tracing` for observability,
//! `thiserror` for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: capabilities, node requests, plugin info. |
//! | [`error`] | [`CsiError`] and [`ConfigError`]. |
//! | [`config`] | [`DriverConfig`], the immutable driver identity. |
//! | [`validate`] | Ordered admission checks for node requests. |
//! | [`mount`] | [`Mounter`] seam over the host mount primitives. |
//! | [`message`] | [`CsiMessage`] protocol envelope for the socket transport. |
//! | [`identity`] | [`CsiIdentity`] trait: plugin discovery & health. |
//! | [`node`] | [`CsiNode`] trait: publish, unpublish, volume stats. |
//! | [`transport`] | Unix socket client/server. |
//! | [`backend`] | The ephemeral bind-mount backend. |
//!
//! [csi]: https://github.com/container-storage-interface/spec

pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod message;
pub mod mount;
pub mod node;
pub mod transport;
pub mod types;
pub mod validate;

// Re-export the most commonly used items at crate root for convenience.
pub use backend::EphemeralBackend;
pub use config::DriverConfig;
pub use error::{ConfigError, CsiError};
pub use identity::CsiIdentity;
pub use message::CsiMessage;
pub use mount::{Mounter, SystemMounter};
pub use node::CsiNode;
pub use transport::client::CsiClient;
pub use transport::server::CsiServer;
pub use types::*;
