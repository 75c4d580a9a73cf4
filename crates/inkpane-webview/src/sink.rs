//! Event bookkeeping shared between a native engine's callbacks and the UI thread.

use crate::event::{LoadState, SurfaceEvent};
use crate::ui::Waker;
use serde_json::Value;

/// Events recorded by engine callbacks, drained by the surface on each tick.
#[derive(Default)]
pub(crate) struct EventSink {
    events: Vec<SurfaceEvent>,
    location: Option<String>,
    /// Location of a programmatic load whose navigation callback should stay quiet.
    expected: Option<String>,
    waker: Option<Waker>,
}

impl EventSink {
    pub(crate) fn new(waker: Option<Waker>) -> Self {
        Self {
            waker,
            ..Self::default()
        }
    }

    pub(crate) fn set_waker(&mut self, waker: Option<Waker>) {
        self.waker = waker;
    }

    pub(crate) fn drain(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    fn push(&mut self, event: SurfaceEvent) {
        self.events.push(event);
        if let Some(waker) = &self.waker {
            waker();
        }
    }

    pub(crate) fn location_changed(&mut self, url: &str) {
        if self.location.as_deref() != Some(url) {
            self.location = Some(url.to_string());
            self.push(SurfaceEvent::LocationChanged(url.to_string()));
        }
    }

    /// The engine is about to navigate to `url` on its own.
    pub(crate) fn navigation_started(&mut self, url: &str) {
        if self.expected.as_deref() == Some(url) {
            self.expected = None;
            return;
        }
        self.push(SurfaceEvent::LoadStateChanged(LoadState::Scheduled));
        self.location_changed(url);
    }

    /// Called before handing `url` to the engine.
    pub(crate) fn load_requested(&mut self, url: &str) {
        self.expected = Some(url.to_string());
    }

    /// The engine accepted the load. Nothing is reported for rejected loads.
    pub(crate) fn load_accepted(&mut self, url: &str) {
        self.push(SurfaceEvent::LoadStateChanged(LoadState::Scheduled));
        self.location_changed(url);
    }

    pub(crate) fn load_rejected(&mut self) {
        self.expected = None;
    }

    pub(crate) fn html_load_accepted(&mut self) {
        self.push(SurfaceEvent::LoadStateChanged(LoadState::Scheduled));
    }

    pub(crate) fn page_started(&mut self) {
        self.push(SurfaceEvent::LoadStateChanged(LoadState::Running));
    }

    pub(crate) fn page_finished(&mut self, url: &str) {
        self.location_changed(url);
        self.push(SurfaceEvent::LoadStateChanged(LoadState::Succeeded));
    }

    /// A message posted over `window.ipc`. Location reports become location
    /// changes; everything else is a host message.
    pub(crate) fn ipc_message(&mut self, body: &str) {
        match location_report(body) {
            Some(url) => self.location_changed(&url),
            None => self.push(SurfaceEvent::HostMessage(body.to_string())),
        }
    }
}

fn location_report(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("location")?.as_str().map(str::to_string)
}
