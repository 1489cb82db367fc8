//! Unix domain socket transport for CSI messages.
//!
//! This module provides [`CsiClient`](client::CsiClient) and
//! [`CsiServer`](server::CsiServer), which exchange JSON-encoded
//! [`CsiMessage`](crate::CsiMessage) values over the plugin socket.  Each
//! connection carries one request and one response: the writer shuts down its
//! half of the stream to mark the end of a message.

pub mod client;
pub mod server;

/// Upper bound on the size of a single encoded message.
pub const MAX_MESSAGE_SIZE: u64 = 16 * 1024 * 1024;
