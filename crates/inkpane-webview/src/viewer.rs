//! External viewers that receive diverted navigations.

use crate::error::{Result, WebViewError};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

/// Something outside the process that can display a URL.
pub trait ExternalViewer: Send + Sync {
    /// Display `url`. May block; callers run it off the UI thread.
    fn open(&self, url: &str) -> Result<()>;
}

/// Turn a location into a URL string the OS will accept, retrying with an
/// `http://` prefix for bare host names.
pub fn to_uri(location: &str) -> Result<String> {
    let trimmed = location.trim();
    if let Ok(url) = Url::parse(trimmed) {
        return Ok(url.into());
    }
    Url::parse(&format!("http://{}", trimmed))
        .map(String::from)
        .map_err(|_| WebViewError::InvalidUrl(location.to_string()))
}

/// The system's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl ExternalViewer for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let uri = to_uri(url)?;
        webbrowser::open(&uri).map_err(|e| WebViewError::ViewerLaunch {
            url: uri.clone(),
            reason: e.to_string(),
        })
    }
}

/// Hand `url` to `viewer` on a short-lived background thread. Failures are logged.
pub fn open_detached(viewer: Arc<dyn ExternalViewer>, url: String) {
    let spawned = thread::Builder::new()
        .name("inkpane-browse".to_string())
        .spawn(move || {
            if let Err(e) = viewer.open(&url) {
                log::warn!("external viewer failed: {}", e);
            }
        });
    if let Err(e) = spawned {
        log::error!("failed to spawn external viewer thread: {}", e);
    }
}

/// Viewer that only records what it was asked to open.
#[derive(Debug, Default)]
pub struct RecordingViewer {
    opened: Mutex<Vec<(String, Option<String>)>>,
    changed: Condvar,
}

impl RecordingViewer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// URLs opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().iter().map(|(u, _)| u.clone()).collect()
    }

    /// Names of the threads each URL was opened on.
    pub fn threads(&self) -> Vec<Option<String>> {
        self.opened.lock().iter().map(|(_, t)| t.clone()).collect()
    }

    /// Block until at least `count` URLs were opened or `timeout` elapses.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        let mut opened = self.opened.lock();
        while opened.len() < count {
            if self.changed.wait_until(&mut opened, deadline).timed_out() {
                break;
            }
        }
        opened.iter().map(|(u, _)| u.clone()).collect()
    }
}

impl ExternalViewer for RecordingViewer {
    fn open(&self, url: &str) -> Result<()> {
        let thread_name = thread::current().name().map(str::to_string);
        self.opened.lock().push((url.to_string(), thread_name));
        self.changed.notify_all();
        Ok(())
    }
}
