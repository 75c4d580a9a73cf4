use anyhow::Result;
use inkpane_server::ResourceServer;
use inkpane_webview::{
    BLANK_LOCATION, HeadlessSurface, LoadState, NavigationMediator, RecordingViewer,
    RenderSurface, RenderSurfaceMode, ScriptHandle, SurfaceEvent, WebViewError,
};
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn mediator(
    mode: RenderSurfaceMode,
) -> (NavigationMediator<HeadlessSurface>, Arc<RecordingViewer>, Arc<ResourceServer>) {
    let server = Arc::new(ResourceServer::embedded());
    let viewer = RecordingViewer::new();
    let mediator = NavigationMediator::new(
        HeadlessSurface::new(),
        mode,
        Arc::clone(&server),
        viewer.clone(),
    );
    (mediator, viewer, server)
}

#[test]
fn redirect_mode_hides_surface_and_blocks_popups() {
    let (mediator, _, _) = mediator(RenderSurfaceMode::Redirect);
    assert!(!mediator.surface().is_visible());
    assert!(!mediator.surface().popups_enabled());
}

#[test]
fn external_navigation_converges_to_blank_within_one_tick() -> Result<()> {
    let (mut mediator, viewer, _) = mediator(RenderSurfaceMode::Redirect);
    mediator.load_url("https://example.com/docs")?;

    // The navigation callback only schedules; the surface is untouched.
    mediator.handle_events();
    assert_eq!(
        mediator.surface().current_url().as_deref(),
        Some("https://example.com/docs")
    );
    assert!(mediator.has_pending_work());

    mediator.tick();
    assert_eq!(mediator.surface().current_url().as_deref(), Some(BLANK_LOCATION));
    assert!(!mediator.has_pending_work());

    // The blank load the mediator issued itself does not trigger another steer.
    mediator.tick();
    assert!(!mediator.has_pending_work());
    assert_eq!(mediator.surface().history().len(), 2);

    let opened = viewer.wait_for(1, Duration::from_secs(5));
    assert_eq!(opened, vec!["https://example.com/docs".to_string()]);
    Ok(())
}

#[test]
fn viewer_never_runs_on_the_ui_thread() -> Result<()> {
    let (mut mediator, viewer, _) = mediator(RenderSurfaceMode::Redirect);
    mediator.load_url("https://example.com/")?;
    mediator.tick();

    viewer.wait_for(1, Duration::from_secs(5));
    let ui_thread = thread::current().name().map(str::to_string);
    for name in viewer.threads() {
        assert_ne!(name, ui_thread);
        assert_eq!(name.as_deref(), Some("inkpane-browse"));
    }
    Ok(())
}

#[test]
fn asset_locations_are_rewritten_to_loopback() -> Result<()> {
    let (mut mediator, viewer, server) = mediator(RenderSurfaceMode::Redirect);
    mediator.load_url("inkpane://localhost/inkpane/editor/index.html?x=1#frag")?;
    mediator.tick();

    let port = server.port().expect("rewrite starts the server");
    let opened = viewer.wait_for(1, Duration::from_secs(5));
    assert_eq!(
        opened,
        vec![format!("http://127.0.0.1:{}/index.html?x=1#frag", port)]
    );
    server.stop();
    Ok(())
}

#[test]
fn injected_content_is_steered_away() -> Result<()> {
    let (mut mediator, viewer, _) = mediator(RenderSurfaceMode::Redirect);
    mediator.load_html("<p>hello</p>")?;
    mediator.tick();
    assert!(mediator.has_pending_work());

    mediator.tick();
    assert_eq!(mediator.surface().current_url().as_deref(), Some(BLANK_LOCATION));
    assert!(viewer.opened().is_empty());
    Ok(())
}

#[test]
fn in_page_navigation_is_intercepted() -> Result<()> {
    let (mut mediator, viewer, _) = mediator(RenderSurfaceMode::Redirect);
    mediator.surface_mut().navigate_in_page("https://example.com/#section");
    mediator.tick();
    mediator.tick();
    assert_eq!(mediator.surface().current_url().as_deref(), Some(BLANK_LOCATION));
    assert_eq!(
        viewer.wait_for(1, Duration::from_secs(5)),
        vec!["https://example.com/#section".to_string()]
    );
    Ok(())
}

#[test]
fn location_and_schedule_in_one_batch_steer_once() -> Result<()> {
    let (mut mediator, _, _) = mediator(RenderSurfaceMode::Redirect);
    mediator.load_url("https://example.com/")?;
    mediator.tick();
    mediator.tick();
    mediator.tick();
    let blanks = mediator
        .surface()
        .history()
        .iter()
        .filter(|u| u.as_str() == BLANK_LOCATION)
        .count();
    assert_eq!(blanks, 1);
    Ok(())
}

#[test]
fn inline_mode_is_a_pass_through() -> Result<()> {
    let (mut mediator, viewer, server) = mediator(RenderSurfaceMode::Inline);
    assert!(mediator.surface().is_visible());
    mediator.load_url("https://example.com/")?;
    let events = mediator.tick();
    assert!(events.contains(&SurfaceEvent::LoadStateChanged(LoadState::Succeeded)));

    mediator.tick();
    assert_eq!(
        mediator.surface().current_url().as_deref(),
        Some("https://example.com/")
    );
    assert!(!mediator.has_pending_work());
    assert!(viewer.opened().is_empty());
    assert!(!server.is_running());
    Ok(())
}

/// Refuses every load of `about:blank`, the way an engine might while it is
/// shutting down.
struct BlankRejectingSurface {
    inner: HeadlessSurface,
    blank_attempts: usize,
}

impl ScriptHandle for BlankRejectingSurface {
    fn execute_script(&mut self, script: &str) -> inkpane_webview::Result<()> {
        self.inner.execute_script(script)
    }

    fn evaluate_script(&mut self, script: &str) -> inkpane_webview::Result<Option<Value>> {
        self.inner.evaluate_script(script)
    }
}

impl RenderSurface for BlankRejectingSurface {
    fn load_url(&mut self, url: &str) -> inkpane_webview::Result<()> {
        if url == BLANK_LOCATION {
            self.blank_attempts += 1;
            return Err(WebViewError::NavigationFailed("engine busy".to_string()));
        }
        self.inner.load_url(url)
    }

    fn load_html(&mut self, html: &str) -> inkpane_webview::Result<()> {
        self.inner.load_html(html)
    }

    fn current_url(&self) -> Option<String> {
        self.inner.current_url()
    }

    fn set_visible(&mut self, visible: bool) {
        self.inner.set_visible(visible);
    }

    fn set_popups_enabled(&mut self, enabled: bool) {
        self.inner.set_popups_enabled(enabled);
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        self.inner.drain_events()
    }
}

#[test]
fn rejected_steer_is_not_retried_in_a_loop() -> Result<()> {
    let surface = BlankRejectingSurface {
        inner: HeadlessSurface::new(),
        blank_attempts: 0,
    };
    let mut mediator = NavigationMediator::new(
        surface,
        RenderSurfaceMode::Redirect,
        Arc::new(ResourceServer::embedded()),
        RecordingViewer::new(),
    );
    mediator.load_url("https://example.com/")?;
    for _ in 0..5 {
        mediator.tick();
    }
    assert_eq!(mediator.surface().blank_attempts, 1);
    assert!(!mediator.has_pending_work());
    Ok(())
}
