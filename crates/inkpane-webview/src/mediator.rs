//! Keeps navigations of a hidden surface out of the process.

use crate::error::Result;
use crate::event::{LoadState, SurfaceEvent};
use crate::navigation::{
    BLANK_LOCATION, NavigationClass, NavigationEvent, rewrite_asset_location,
};
use crate::ui::{UiQueue, Waker};
use crate::viewer::{ExternalViewer, open_detached};
use crate::{RenderSurface, RenderSurfaceMode};
use inkpane_server::ResourceServer;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediatorTask {
    SteerToBlank,
}

/// Wraps a [`RenderSurface`] and decides, per navigation, whether it may proceed.
///
/// In [`RenderSurfaceMode::Inline`] every call and event passes straight through.
/// In [`RenderSurfaceMode::Redirect`] the surface is hidden with popups suppressed,
/// and every resolvable location change is rewritten (asset-root locations become
/// loopback URLs), handed to the external viewer off the UI thread, and followed
/// by a steer back to `about:blank` on the next tick. Loads that are scheduled
/// without a location get the same steer.
///
/// The mediator never touches the surface from inside event handling; all steering
/// happens at the start of [`tick`](Self::tick).
pub struct NavigationMediator<S: RenderSurface> {
    surface: S,
    mode: RenderSurfaceMode,
    server: Arc<ResourceServer>,
    viewer: Arc<dyn ExternalViewer>,
    queue: UiQueue<MediatorTask>,
    steer_queued: bool,
    own_blank_loads: usize,
}

impl<S: RenderSurface> NavigationMediator<S> {
    pub fn new(
        mut surface: S,
        mode: RenderSurfaceMode,
        server: Arc<ResourceServer>,
        viewer: Arc<dyn ExternalViewer>,
    ) -> Self {
        if mode == RenderSurfaceMode::Redirect {
            surface.set_visible(false);
            surface.set_popups_enabled(false);
        }
        Self {
            surface,
            mode,
            server,
            viewer,
            queue: UiQueue::new(),
            steer_queued: false,
            own_blank_loads: 0,
        }
    }

    pub fn mode(&self) -> RenderSurfaceMode {
        self.mode
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn server(&self) -> &Arc<ResourceServer> {
        &self.server
    }

    /// Callback invoked whenever the mediator posts deferred work.
    pub fn set_waker(&mut self, waker: Option<Waker>) {
        self.queue.set_waker(waker);
    }

    pub fn load_url(&mut self, url: &str) -> Result<()> {
        self.surface.load_url(url)
    }

    pub fn load_html(&mut self, html: &str) -> Result<()> {
        self.surface.load_html(html)
    }

    /// One UI tick: run work deferred by the previous tick, then handle new
    /// surface events. Returns the handled events for further dispatch.
    pub fn tick(&mut self) -> Vec<SurfaceEvent> {
        self.run_deferred();
        self.handle_events()
    }

    /// Run deferred steers without looking at new events.
    pub fn run_deferred(&mut self) {
        for task in self.queue.drain() {
            match task {
                MediatorTask::SteerToBlank => self.steer_to_blank(),
            }
        }
    }

    /// Drain and react to the surface's events. Anything destructive is posted
    /// for the next tick.
    pub fn handle_events(&mut self) -> Vec<SurfaceEvent> {
        let events = self.surface.drain_events();
        if self.mode == RenderSurfaceMode::Redirect {
            for event in &events {
                self.redirect(event);
            }
        }
        events
    }

    /// True while a steer is waiting for the next tick.
    pub fn has_pending_work(&self) -> bool {
        self.steer_queued
    }

    fn redirect(&mut self, event: &SurfaceEvent) {
        match event {
            SurfaceEvent::LocationChanged(location) => {
                let nav = NavigationEvent::new(location.as_str());
                let target = match nav.classify(self.server.root()) {
                    NavigationClass::NonNavigable => return,
                    NavigationClass::AssetLocal => {
                        rewrite_asset_location(location, self.server.root(), &self.server)
                    }
                    NavigationClass::External => location.clone(),
                };
                log::debug!("diverting {} to external viewer as {}", location, target);
                open_detached(Arc::clone(&self.viewer), target);
                self.post_steer();
            }
            SurfaceEvent::LoadStateChanged(LoadState::Scheduled) => {
                if self.own_blank_loads > 0 {
                    self.own_blank_loads -= 1;
                } else {
                    self.post_steer();
                }
            }
            _ => {}
        }
    }

    fn post_steer(&mut self) {
        if !self.steer_queued {
            self.steer_queued = true;
            self.queue.post(MediatorTask::SteerToBlank);
        }
    }

    fn steer_to_blank(&mut self) {
        self.steer_queued = false;
        match self.surface.load_url(BLANK_LOCATION) {
            Ok(()) => self.own_blank_loads += 1,
            Err(e) => log::warn!("failed to steer hidden surface to blank: {}", e),
        }
    }
}
