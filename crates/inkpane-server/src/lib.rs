//! Loopback HTTP server for the packaged editor bundle.
//!
//! The editor page spawns worker scripts that must be same-origin with the
//! page. Packaged (`inkpane://`) and `file:` locations do not satisfy that in an
//! external browser, so the bundle is also exposed over `http://127.0.0.1:<port>/`.
//!
//! # Request handling
//!
//! Every request target is normalized (separators unified and collapsed, an
//! accidental root prefix stripped, leading `./` segments removed, `/` mapped to
//! `index.html`), then:
//!
//! - traversal segments are rejected with 400,
//! - `/favicon.ico` gets an empty 204,
//! - known assets are served with 200, a content type from a fixed table and
//!   cache-disabling headers,
//! - anything else is a 404 naming the path; handler failures become 500.

mod assets;
mod error;
mod pool;
mod request;
mod root;
mod server;

pub use assets::{AssetSource, DirectoryAssets, EmbeddedAssets};
pub use error::{Result, ServerError};
pub use request::{AssetResponse, content_type_for, has_traversal, normalize_request_path, respond};
pub use root::{ARCHIVE_SCHEME, AssetRoot, DEFAULT_DOCUMENT, EDITOR_ROOT};
pub use server::{ResourceServer, ServerOptions, ShutdownGuard};

use std::sync::Arc;
use std::time::Duration;

/// Build the server described by the `[server]` section of the configuration
/// values: an on-disk bundle when `asset_dir` is set, otherwise the embedded one.
pub fn from_settings(
    bind_host: &str,
    asset_dir: Option<&std::path::Path>,
    keep_alive_secs: u64,
) -> ResourceServer {
    let source: Arc<dyn AssetSource> = match asset_dir {
        Some(dir) => Arc::new(DirectoryAssets::new(dir)),
        None => Arc::new(EmbeddedAssets),
    };
    ResourceServer::new(
        AssetRoot::editor(),
        source,
        ServerOptions {
            bind_host: bind_host.to_string(),
            worker_keep_alive: Duration::from_secs(keep_alive_secs),
        },
    )
}
