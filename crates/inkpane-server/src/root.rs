//! The logical prefix of the packaged editor bundle.

/// Document served for `/` and for an empty asset sub-path.
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// Scheme of packaged (in-binary) asset locations, e.g. `inkpane://localhost/inkpane/editor/index.html`.
pub const ARCHIVE_SCHEME: &str = "inkpane";

const ARCHIVE_HOST: &str = "localhost";

/// Prefix of the editor bundle inside the packaged asset tree.
pub const EDITOR_ROOT: &str = "/inkpane/editor";

/// Immutable logical path prefix identifying the packaged subtree that gets served.
///
/// The prefix always starts with `/` and never ends with one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRoot {
    prefix: String,
}

impl AssetRoot {
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let trimmed = prefix.as_ref().trim().trim_matches('/');
        Self {
            prefix: format!("/{}", trimmed),
        }
    }

    /// The bundled editor root.
    pub fn editor() -> Self {
        Self::new(EDITOR_ROOT)
    }

    /// Prefix without trailing separator, e.g. `/inkpane/editor`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix with a trailing separator. Locations containing this are asset-local.
    pub fn marker(&self) -> String {
        format!("{}/", self.prefix)
    }

    /// Strip the prefix from `path` if it is the prefix itself or starts with `prefix/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Key of a normalized request path (`/vs/loader.js`) inside the asset tree
    /// (`inkpane/editor/vs/loader.js`).
    pub fn resolve(&self, normalized: &str) -> String {
        let rel = normalized.trim_start_matches('/');
        format!("{}/{}", self.prefix.trim_start_matches('/'), rel)
    }

    /// Packaged-archive location of an asset, used for inline loading.
    pub fn packaged_url(&self, asset_path: &str) -> String {
        format!(
            "{}://{}{}/{}",
            ARCHIVE_SCHEME,
            ARCHIVE_HOST,
            self.prefix,
            asset_path.trim_start_matches('/')
        )
    }

    /// Packaged-archive location of the default document.
    pub fn default_document_url(&self) -> String {
        self.packaged_url(DEFAULT_DOCUMENT)
    }
}

impl Default for AssetRoot {
    fn default() -> Self {
        Self::editor()
    }
}
