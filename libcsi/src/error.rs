//! CSI error types.
//!
//! Request-level failures are represented by [`CsiError`], which derives
//! [`thiserror::Error`] and also implements [`Serialize`]/[`Deserialize`] so
//! errors can travel back to the caller across the socket transport.
//!
//! Misconfiguration detected while building the driver is a separate
//! [`ConfigError`]: it stops the process from starting and never reaches a
//! caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by CSI operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum CsiError {
    /// The caller supplied a malformed or policy-violating request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A filesystem or mount operation on the host failed.
    #[error("internal error: {0}")]
    Internal(String),

    /// A socket / codec-level error in the transport layer.
    #[error("transport error: {0}")]
    TransportError(String),
}

impl CsiError {
    /// Create a [`CsiError::TransportError`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::TransportError(e.to_string())
    }

    /// Create a [`CsiError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// The human-readable reason without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(msg) | Self::Internal(msg) | Self::TransportError(msg) => msg,
        }
    }
}

/// Fatal driver misconfiguration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("node ID is required")]
    MissingNodeId,

    #[error("NSM API socket directory is required")]
    MissingSocketDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CsiError::InvalidArgument("missing volume id".into());
        assert_eq!(err.to_string(), "invalid argument: missing volume id");
        assert_eq!(err.message(), "missing volume id");
    }

    #[test]
    fn error_crosses_the_wire() {
        let err = CsiError::Internal("unable to mount \"/mnt/test\": permission denied".into());
        let json = serde_json::to_string(&err).expect("serialize");
        let de: CsiError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(err, de);
    }

    #[test]
    fn config_error_display() {
        assert_eq!(ConfigError::MissingNodeId.to_string(), "node ID is required");
    }
}
