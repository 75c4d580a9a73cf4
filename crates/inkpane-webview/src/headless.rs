//! In-memory surface for driving the mediator and bridge without a web engine.

use crate::error::{Result, WebViewError};
use crate::event::{LoadState, SurfaceEvent};
use crate::{RenderSurface, ScriptHandle, host_object_script};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;

type Responder = Box<dyn FnMut(&str) -> Result<Option<Value>> + Send>;

/// A surface that records what it is asked to do and reports the events a real
/// engine would.
///
/// Loads report `Scheduled`, a location change (when the location differs) and
/// `Running`; with auto-complete on (the default) they also report `Succeeded`.
/// Script evaluation is delegated to an optional responder, so tests can plug in
/// a fake guest.
pub struct HeadlessSurface {
    current_url: Option<String>,
    visible: bool,
    popups_enabled: bool,
    auto_complete: bool,
    history: Vec<String>,
    html_loads: Vec<String>,
    scripts: Vec<String>,
    host_objects: Vec<(String, Vec<String>)>,
    events: VecDeque<SurfaceEvent>,
    responder: Option<Responder>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            current_url: None,
            visible: true,
            popups_enabled: true,
            auto_complete: true,
            history: Vec::new(),
            html_loads: Vec::new(),
            scripts: Vec::new(),
            host_objects: Vec::new(),
            events: VecDeque::new(),
            responder: None,
        }
    }

    /// Leave loads in `Running` until [`complete_load`](Self::complete_load) or
    /// [`fail_load`](Self::fail_load) is called.
    pub fn manual_completion(mut self) -> Self {
        self.auto_complete = false;
        self
    }

    /// Answer scripts with `responder`. Without one, scripts succeed and evaluate to nothing.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: FnMut(&str) -> Result<Option<Value>> + Send + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn complete_load(&mut self) {
        self.events
            .push_back(SurfaceEvent::LoadStateChanged(LoadState::Succeeded));
    }

    pub fn fail_load(&mut self) {
        self.events
            .push_back(SurfaceEvent::LoadStateChanged(LoadState::Failed));
    }

    /// Change location without a load, like a fragment or history navigation.
    pub fn navigate_in_page(&mut self, url: &str) {
        self.set_location(Some(url.to_string()));
    }

    /// Simulate guest code calling `window[object][method]()`. Returns false if
    /// no such object was installed.
    pub fn emit_host_message(&mut self, object: &str, method: &str) -> bool {
        let installed = self
            .host_objects
            .iter()
            .any(|(name, methods)| name == object && methods.iter().any(|m| m == method));
        if installed {
            let message = serde_json::json!({ "object": object, "method": method });
            self.events
                .push_back(SurfaceEvent::HostMessage(message.to_string()));
        }
        installed
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn popups_enabled(&self) -> bool {
        self.popups_enabled
    }

    /// Every URL passed to `load_url`, in order.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Every document passed to `load_html`, in order.
    pub fn html_loads(&self) -> &[String] {
        &self.html_loads
    }

    /// Every script executed or evaluated, in order.
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn host_objects(&self) -> Vec<String> {
        self.host_objects.iter().map(|(n, _)| n.clone()).collect()
    }

    fn set_location(&mut self, location: Option<String>) {
        if location != self.current_url {
            if let Some(url) = &location {
                self.events
                    .push_back(SurfaceEvent::LocationChanged(url.clone()));
            }
            self.current_url = location;
        }
    }

    fn begin_load(&mut self) {
        self.events
            .push_back(SurfaceEvent::LoadStateChanged(LoadState::Scheduled));
    }

    fn finish_load(&mut self) {
        self.events
            .push_back(SurfaceEvent::LoadStateChanged(LoadState::Running));
        if self.auto_complete {
            self.complete_load();
        }
    }

    fn run(&mut self, script: &str) -> Result<Option<Value>> {
        self.scripts.push(script.to_string());
        match self.responder.as_mut() {
            Some(responder) => responder(script),
            None => Ok(None),
        }
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessSurface")
            .field("current_url", &self.current_url)
            .field("visible", &self.visible)
            .field("popups_enabled", &self.popups_enabled)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl ScriptHandle for HeadlessSurface {
    fn execute_script(&mut self, script: &str) -> Result<()> {
        self.run(script).map(|_| ())
    }

    fn evaluate_script(&mut self, script: &str) -> Result<Option<Value>> {
        self.run(script)
    }
}

impl RenderSurface for HeadlessSurface {
    fn load_url(&mut self, url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(WebViewError::NavigationFailed("empty location".to_string()));
        }
        self.history.push(url.to_string());
        self.begin_load();
        self.set_location(Some(url.to_string()));
        self.finish_load();
        Ok(())
    }

    fn load_html(&mut self, html: &str) -> Result<()> {
        self.html_loads.push(html.to_string());
        self.begin_load();
        self.current_url = None;
        self.finish_load();
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.current_url.clone()
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_popups_enabled(&mut self, enabled: bool) {
        self.popups_enabled = enabled;
    }

    fn install_host_object(&mut self, name: &str, methods: &[&str]) -> Result<()> {
        self.scripts.push(host_object_script(name, methods));
        self.host_objects.retain(|(n, _)| n != name);
        self.host_objects.push((
            name.to_string(),
            methods.iter().map(|m| m.to_string()).collect(),
        ));
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        self.events.drain(..).collect()
    }
}
