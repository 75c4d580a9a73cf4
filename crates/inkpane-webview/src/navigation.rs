//! Classification and rewriting of navigation targets.

use inkpane_server::{ARCHIVE_SCHEME, AssetRoot, DEFAULT_DOCUMENT, ResourceServer};

/// Neutral location the hidden surface is steered to in redirect mode.
pub const BLANK_LOCATION: &str = "about:blank";

const RESOLVABLE_PREFIXES: &[&str] = &[
    "http://", "https://", "file:/", "mailto:", "ftp://", "data:",
];

/// Where an attempted navigation points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationClass {
    /// Inside the packaged asset root.
    AssetLocal,
    /// Any other resolvable URL.
    External,
    /// Content without a resolvable location (e.g. injected markup).
    NonNavigable,
}

/// A location change observed on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub target_location: String,
    pub is_resolvable_url: bool,
}

impl NavigationEvent {
    pub fn new(location: impl Into<String>) -> Self {
        let target_location = location.into();
        let is_resolvable_url = is_resolvable_url(&target_location);
        Self {
            target_location,
            is_resolvable_url,
        }
    }

    pub fn classify(&self, root: &AssetRoot) -> NavigationClass {
        if !self.is_resolvable_url {
            NavigationClass::NonNavigable
        } else if asset_target(&self.target_location, root).is_some() {
            NavigationClass::AssetLocal
        } else {
            NavigationClass::External
        }
    }
}

/// True for non-empty locations with a scheme worth handing to an external viewer.
pub fn is_resolvable_url(location: &str) -> bool {
    let v = location.trim();
    if v.is_empty() {
        return false;
    }
    let lower = v.to_ascii_lowercase();
    RESOLVABLE_PREFIXES.iter().any(|p| lower.starts_with(p))
        || lower.starts_with(&format!("{}:", ARCHIVE_SCHEME))
}

/// A location inside the asset root, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTarget {
    /// Sub-path after the root marker, never empty.
    pub path: String,
    /// Query string including the leading `?`, or empty.
    pub query: String,
    /// Fragment including the leading `#`, or empty.
    pub fragment: String,
}

/// Split a packaged-archive or `file:` location that points under `root`.
pub fn asset_target(location: &str, root: &AssetRoot) -> Option<AssetTarget> {
    let lower = location.to_ascii_lowercase();
    let packaged = lower.starts_with(&format!("{}:", ARCHIVE_SCHEME));
    if !packaged && !lower.starts_with("file:") {
        return None;
    }

    let marker = root.marker();
    let start = location.find(&marker)? + marker.len();
    let rest = &location[start..];

    let query_at = rest.find('?');
    let hash_at = rest.find('#');
    let path_end = match (query_at, hash_at) {
        (Some(q), Some(h)) => q.min(h),
        (Some(q), None) => q,
        (None, Some(h)) => h,
        (None, None) => rest.len(),
    };

    let query = match (query_at, hash_at) {
        (Some(q), Some(h)) if q < h => &rest[q..h],
        (Some(q), None) => &rest[q..],
        _ => "",
    };
    let fragment = hash_at.map(|h| &rest[h..]).unwrap_or("");

    let path = &rest[..path_end];
    let path = if path.is_empty() { DEFAULT_DOCUMENT } else { path };

    Some(AssetTarget {
        path: path.to_string(),
        query: query.to_string(),
        fragment: fragment.to_string(),
    })
}

/// Rewrite an asset-local location to the loopback server, starting it if needed.
///
/// Locations outside the root come back unchanged, and so does everything when
/// the server cannot be started.
pub fn rewrite_asset_location(location: &str, root: &AssetRoot, server: &ResourceServer) -> String {
    let Some(target) = asset_target(location, root) else {
        return location.to_string();
    };
    match server.url_for(&target.path) {
        Ok(base) => format!("{}{}{}", base, target.query, target.fragment),
        Err(e) => {
            log::error!(
                "failed to start resource server, falling back to original location {}: {}",
                location,
                e
            );
            location.to_string()
        }
    }
}
