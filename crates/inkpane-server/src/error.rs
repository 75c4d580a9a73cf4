//! Error types for the resource server.

use thiserror::Error;

/// Result type for resource server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while running the resource server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Binding the loopback listener failed.
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// The listener came up without an IP address to report.
    #[error("listener has no IP address")]
    NoAddress,

    /// Spawning the acceptor thread failed.
    #[error("failed to spawn server thread: {0}")]
    Spawn(String),
}
