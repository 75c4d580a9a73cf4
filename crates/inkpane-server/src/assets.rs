//! Sources for the packaged asset tree.

use include_dir::{Dir, include_dir};
use std::borrow::Cow;
use std::io;
use std::path::{Component, Path, PathBuf};

static EMBEDDED: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Read-only lookup of asset bytes by tree key (e.g. `inkpane/editor/index.html`).
pub trait AssetSource: Send + Sync {
    /// Returns `Ok(None)` when the asset does not exist.
    fn read(&self, key: &str) -> io::Result<Option<Cow<'static, [u8]>>>;

    fn contains(&self, key: &str) -> bool {
        matches!(self.read(key), Ok(Some(_)))
    }

    /// Short description for log lines.
    fn describe(&self) -> String;
}

/// The asset tree compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

impl AssetSource for EmbeddedAssets {
    fn read(&self, key: &str) -> io::Result<Option<Cow<'static, [u8]>>> {
        Ok(EMBEDDED
            .get_file(key.trim_start_matches('/'))
            .map(|f| Cow::Borrowed(f.contents())))
    }

    fn describe(&self) -> String {
        "embedded bundle".to_string()
    }
}

/// An on-disk directory laid out like the embedded tree.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    base: PathBuf,
}

impl DirectoryAssets {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let rel = Path::new(key.trim_start_matches('/'));
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.base.join(rel))
    }
}

impl AssetSource for DirectoryAssets {
    fn read(&self, key: &str) -> io::Result<Option<Cow<'static, [u8]>>> {
        let Some(path) = self.path_for(key) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        std::fs::read(&path).map(|bytes| Some(Cow::Owned(bytes)))
    }

    fn describe(&self) -> String {
        format!("directory {}", self.base.display())
    }
}
