//! Error types for rendering surfaces.

use thiserror::Error;

/// Result type for rendering-surface operations.
pub type Result<T> = std::result::Result<T, WebViewError>;

/// Errors that can occur while driving a rendering surface.
#[derive(Error, Debug)]
pub enum WebViewError {
    /// Surface construction failed.
    #[error("surface initialization failed: {0}")]
    InitFailed(String),

    /// Navigation failed.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// Script execution or evaluation failed inside the guest.
    #[error("script execution failed: {0}")]
    Script(String),

    /// The backend cannot perform this operation.
    #[error("unsupported by this backend: {0}")]
    Unsupported(&'static str),

    /// A location could not be turned into a URL.
    #[error("not a valid URL: {0}")]
    InvalidUrl(String),

    /// The external viewer could not be launched.
    #[error("failed to open external viewer for {url}: {reason}")]
    ViewerLaunch { url: String, reason: String },
}
