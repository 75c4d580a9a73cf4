//! Rendering-surface abstraction and navigation mediation for the embedded editor.
//!
//! A [`RenderSurface`] is anything that can load web content and run scripts in
//! it. The [`NavigationMediator`] wraps one and, in [`RenderSurfaceMode::Redirect`],
//! keeps every resolvable navigation out of the hidden surface by handing it to an
//! [`ExternalViewer`] and steering the surface back to `about:blank` on the next
//! UI tick.
//!
//! # Features
//!
//! - `wry`: native webview backend ([`WrySurface`]) built on `wry` + `tao`

mod error;
mod event;
mod headless;
mod mediator;
mod navigation;
#[cfg(any(feature = "wry", test))]
mod sink;
mod ui;
mod viewer;

#[cfg(feature = "wry")]
mod wry_backend;

pub use error::{Result, WebViewError};
pub use event::{LoadState, SurfaceEvent};
pub use headless::HeadlessSurface;
pub use mediator::NavigationMediator;
pub use navigation::{
    AssetTarget, BLANK_LOCATION, NavigationClass, NavigationEvent, asset_target,
    is_resolvable_url, rewrite_asset_location,
};
pub use ui::{UiQueue, Waker};
pub use viewer::{ExternalViewer, RecordingViewer, SystemBrowser, open_detached, to_uri};

#[cfg(feature = "wry")]
pub use wry_backend::WrySurface;

use serde_json::Value;

/// How a surface is allowed to display content. Fixed for the lifetime of a mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderSurfaceMode {
    /// Content renders inside the surface; the mediator is a pass-through.
    #[default]
    Inline,
    /// Nothing renders inside the process; resolvable navigations go to an external viewer.
    Redirect,
}

impl RenderSurfaceMode {
    pub fn from_redirect_flag(redirect: bool) -> Self {
        if redirect { Self::Redirect } else { Self::Inline }
    }
}

/// Configuration for a native surface.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Enable the engine's developer tools where available.
    pub devtools: bool,
    /// Start visible. Redirect-mode surfaces are hidden regardless.
    pub visible: bool,
    /// Host objects defined before any page script runs, as `(name, methods)`.
    pub host_objects: Vec<(String, Vec<String>)>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            devtools: false,
            visible: true,
            host_objects: Vec::new(),
        }
    }
}

impl SurfaceConfig {
    /// Scripts a native backend registers to run at document start, in order.
    pub fn initialization_scripts(&self) -> Vec<String> {
        let mut scripts: Vec<String> = self
            .host_objects
            .iter()
            .map(|(name, methods)| {
                let methods: Vec<&str> = methods.iter().map(String::as_str).collect();
                host_object_script(name, &methods)
            })
            .collect();
        scripts.push(LOCATION_WATCH_SCRIPT.to_string());
        scripts
    }
}

/// Builder for [`SurfaceConfig`].
pub struct SurfaceBuilder {
    config: SurfaceConfig,
}

impl SurfaceBuilder {
    pub fn new() -> Self {
        Self {
            config: SurfaceConfig::default(),
        }
    }

    pub fn with_devtools(mut self, devtools: bool) -> Self {
        self.config.devtools = devtools;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.config.visible = false;
        self
    }

    /// Define `window[name]` at document start, so page scripts can call it
    /// before the load completes.
    pub fn with_host_object(mut self, name: &str, methods: &[&str]) -> Self {
        self.config.host_objects.push((
            name.to_string(),
            methods.iter().map(|m| (*m).to_string()).collect(),
        ));
        self
    }

    pub fn build(self) -> SurfaceConfig {
        self.config
    }
}

impl Default for SurfaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion for an asynchronous evaluation.
pub type EvalCallback = Box<dyn FnOnce(Result<Option<Value>>) + Send + 'static>;

/// Script-execution handle of a surface. Only used from the UI-owning thread.
pub trait ScriptHandle {
    /// Run a script, discarding its result.
    fn execute_script(&mut self, script: &str) -> Result<()>;

    /// Run a script and return its JSON-converted result.
    ///
    /// Backends without synchronous evaluation return [`WebViewError::Unsupported`].
    fn evaluate_script(&mut self, script: &str) -> Result<Option<Value>>;

    /// Run a script and deliver its result to `callback`, possibly on another thread.
    fn evaluate_script_with_callback(&mut self, script: &str, callback: EvalCallback) -> Result<()> {
        let result = self.evaluate_script(script);
        callback(result);
        Ok(())
    }
}

/// An embedded component that loads and executes web content.
pub trait RenderSurface: ScriptHandle {
    /// Navigate to a URL. A load that returns an error reports no events.
    fn load_url(&mut self, url: &str) -> Result<()>;

    /// Load markup with no resolvable location. Same error contract as `load_url`.
    fn load_html(&mut self, html: &str) -> Result<()>;

    /// Current location, if the surface has one.
    fn current_url(&self) -> Option<String>;

    fn set_visible(&mut self, visible: bool);

    /// Allow or suppress secondary windows opened by page content.
    fn set_popups_enabled(&mut self, enabled: bool);

    /// Expose an object under `window[name]` whose methods report back as
    /// [`SurfaceEvent::HostMessage`].
    fn install_host_object(&mut self, name: &str, methods: &[&str]) -> Result<()> {
        self.execute_script(&host_object_script(name, methods))
    }

    /// Take the events reported since the last call, in order.
    fn drain_events(&mut self) -> Vec<SurfaceEvent>;
}

/// Reports fragment and history navigations, which engines load without a
/// navigation callback, as `{"location": <href>}` over the IPC channel.
pub const LOCATION_WATCH_SCRIPT: &str = r#"(function () {
  if (!window.ipc || window.__inkpaneLocationWatch) { return; }
  window.__inkpaneLocationWatch = true;
  var report = function () {
    window.ipc.postMessage(JSON.stringify({ location: window.location.href }));
  };
  window.addEventListener('hashchange', report);
  window.addEventListener('popstate', report);
  ['pushState', 'replaceState'].forEach(function (name) {
    var original = history[name];
    history[name] = function () {
      var result = original.apply(this, arguments);
      report();
      return result;
    };
  });
})();"#;

/// Script installing a host object whose methods post
/// `{"object": <name>, "method": <method>}` over the engine's IPC channel.
pub fn host_object_script(name: &str, methods: &[&str]) -> String {
    let object = Value::String(name.to_string()).to_string();
    let members: Vec<String> = methods
        .iter()
        .map(|method| {
            let message = format!(
                "{{\"object\":{},\"method\":{}}}",
                Value::String(name.to_string()),
                Value::String((*method).to_string())
            );
            format!(
                "{}: function() {{ window.ipc.postMessage({}); }}",
                Value::String((*method).to_string()),
                Value::String(message)
            )
        })
        .collect();
    format!("window[{}] = {{ {} }};", object, members.join(", "))
}
