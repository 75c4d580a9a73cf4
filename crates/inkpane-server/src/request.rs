//! Transport-independent request handling: path normalization, content types
//! and the response for a single asset request.

use crate::assets::AssetSource;
use crate::root::{AssetRoot, DEFAULT_DOCUMENT};
use chrono::Utc;

const FAVICON: &str = "/favicon.ico";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Normalize a raw request target into a root-relative path starting with `/`.
///
/// Query strings and fragments are dropped and percent-escapes decoded before
/// the path is cleaned up, so encoded traversal segments are still visible to
/// [`has_traversal`].
pub fn normalize_request_path(raw: &str, root: &AssetRoot) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let target = &raw[..end];
    let decoded = urlencoding::decode(target)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| target.to_string());

    let mut path = decoded.replace('\\', "/");
    while path.contains("//") {
        path = path.replace("//", "/");
    }

    let anchored = if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    };
    let mut path = match root.strip(&anchored) {
        Some("") => "/".to_string(),
        Some(rest) => rest.to_string(),
        None => anchored,
    };

    while path.starts_with("/./") {
        path = path[2..].to_string();
    }
    if path == "/" || path == "/." {
        path = format!("/{}", DEFAULT_DOCUMENT);
    }
    path
}

/// True if any segment of the path is a parent-directory reference.
pub fn has_traversal(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// Content type for a path, from a fixed extension table.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "map" | "json" => "application/json; charset=utf-8",
        "svg" => "image/svg+xml",
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        "ttf" => "font/ttf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ico" => "image/x-icon",
        "html" | "htm" => "text/html; charset=utf-8",
        "txt" => TEXT_PLAIN,
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// A fully formed response, ready to be written by any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl AssetResponse {
    fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            headers: Vec::new(),
            body: text.into().into_bytes(),
        }
    }

    pub fn bad_request() -> Self {
        Self::text(400, "Bad Request")
    }

    pub fn not_found(path: &str) -> Self {
        Self::text(404, format!("Not Found: {}", path))
    }

    pub fn internal_error() -> Self {
        Self::text(500, "Internal Server Error")
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            content_type: "image/x-icon",
            headers: no_cache_headers(),
            body: Vec::new(),
        }
    }

    fn ok(path: &str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: content_type_for(path),
            headers: no_cache_headers(),
            body,
        }
    }

    /// Look up a header set on this response (excluding the content type).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn no_cache_headers() -> Vec<(&'static str, String)> {
    vec![
        ("Cache-Control", "no-cache, no-store, must-revalidate".to_string()),
        ("Pragma", "no-cache".to_string()),
        ("Expires", "0".to_string()),
        (
            "Date",
            Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        ),
    ]
}

/// Produce the response for a raw request target.
pub fn respond(source: &dyn AssetSource, root: &AssetRoot, raw_target: &str) -> AssetResponse {
    let path = normalize_request_path(raw_target, root);

    if has_traversal(&path) {
        log::warn!("rejecting traversal request {}", raw_target);
        return AssetResponse::bad_request();
    }

    if path == FAVICON {
        return AssetResponse::no_content();
    }

    match source.read(&root.resolve(&path)) {
        Ok(Some(bytes)) => AssetResponse::ok(&path, bytes.into_owned()),
        Ok(None) => {
            log::debug!("asset not found: {} ({})", path, source.describe());
            AssetResponse::not_found(&path)
        }
        Err(e) => {
            log::error!("failed to read asset {}: {}", path, e);
            AssetResponse::internal_error()
        }
    }
}
