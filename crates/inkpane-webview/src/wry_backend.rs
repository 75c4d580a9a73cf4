//! Native surface backed by `wry`.
//!
//! The webview's callbacks run inside the engine, so they only record events into
//! a shared sink and wake the host event loop. The mediator and bridge consume the
//! events on the next tick.

use crate::error::{Result, WebViewError};
use crate::event::SurfaceEvent;
use crate::sink::EventSink;
use crate::ui::Waker;
use crate::{EvalCallback, RenderSurface, ScriptHandle, SurfaceConfig};
use inkpane_server::{ARCHIVE_SCHEME, ResourceServer, respond};
use parking_lot::Mutex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tao::window::Window;
use wry::http::{Request, Response};
use wry::{PageLoadEvent, WebView, WebViewBuilder};

/// A `wry` webview living in a `tao` window.
///
/// Packaged locations (`inkpane://localhost/...`) are served by a custom protocol
/// handler that runs the same request handling as the loopback server. Host
/// objects from the [`SurfaceConfig`] and the location watch are registered as
/// initialization scripts, so they exist before any page script runs.
pub struct WrySurface {
    webview: WebView,
    sink: Arc<Mutex<EventSink>>,
    popups: Arc<AtomicBool>,
}

impl WrySurface {
    pub fn new(
        window: &Window,
        config: &SurfaceConfig,
        server: Arc<ResourceServer>,
        waker: Option<Waker>,
    ) -> Result<Self> {
        let sink = Arc::new(Mutex::new(EventSink::new(waker)));
        let popups = Arc::new(AtomicBool::new(true));

        #[cfg(any(
            target_os = "windows",
            target_os = "macos",
            target_os = "ios",
            target_os = "android"
        ))]
        let builder = WebViewBuilder::new(window);

        #[cfg(not(any(
            target_os = "windows",
            target_os = "macos",
            target_os = "ios",
            target_os = "android"
        )))]
        let builder = {
            use tao::platform::unix::WindowExtUnix;
            use wry::WebViewBuilderExtUnix;
            let vbox = window.default_vbox().ok_or_else(|| {
                WebViewError::InitFailed("linux gtk container not available".to_string())
            })?;
            WebViewBuilder::new_gtk(vbox)
        };

        let nav_sink = Arc::clone(&sink);
        let load_sink = Arc::clone(&sink);
        let ipc_sink = Arc::clone(&sink);
        let popup_flag = Arc::clone(&popups);

        let mut builder = builder;
        for script in config.initialization_scripts() {
            builder = builder.with_initialization_script(&script);
        }

        let webview = builder
            .with_visible(config.visible)
            .with_devtools(config.devtools)
            .with_navigation_handler(move |url: String| {
                nav_sink.lock().navigation_started(&url);
                true
            })
            .with_on_page_load_handler(move |event, url| {
                let mut sink = load_sink.lock();
                match event {
                    PageLoadEvent::Started => sink.page_started(),
                    PageLoadEvent::Finished => sink.page_finished(&url),
                }
            })
            .with_new_window_req_handler(move |url: String| {
                let allowed = popup_flag.load(Ordering::SeqCst);
                if !allowed {
                    log::debug!("suppressed popup for {}", url);
                }
                allowed
            })
            .with_ipc_handler(move |request: Request<String>| {
                ipc_sink.lock().ipc_message(request.body());
            })
            .with_custom_protocol(ARCHIVE_SCHEME.to_string(), move |_id, request| {
                serve_packaged(&server, &request)
            })
            .build()
            .map_err(|e| WebViewError::InitFailed(e.to_string()))?;

        Ok(Self {
            webview,
            sink,
            popups,
        })
    }

    /// Replace the callback that wakes the host event loop when events arrive.
    pub fn set_waker(&mut self, waker: Option<Waker>) {
        self.sink.lock().set_waker(waker);
    }

    pub fn webview(&self) -> &WebView {
        &self.webview
    }
}

fn serve_packaged(server: &ResourceServer, request: &Request<Vec<u8>>) -> Response<Cow<'static, [u8]>> {
    let answer = respond(server.source().as_ref(), server.root(), request.uri().path());
    let mut builder = Response::builder()
        .status(answer.status)
        .header("Content-Type", answer.content_type);
    for (name, value) in &answer.headers {
        builder = builder.header(*name, value.as_str());
    }
    builder
        .body(Cow::Owned(answer.body))
        .unwrap_or_else(|e| {
            log::error!("failed to build packaged response: {}", e);
            let mut fallback = Response::new(Cow::Borrowed(&b""[..]));
            *fallback.status_mut() = wry::http::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

impl ScriptHandle for WrySurface {
    fn execute_script(&mut self, script: &str) -> Result<()> {
        self.webview
            .evaluate_script(script)
            .map_err(|e| WebViewError::Script(e.to_string()))
    }

    fn evaluate_script(&mut self, _script: &str) -> Result<Option<Value>> {
        Err(WebViewError::Unsupported("synchronous script evaluation"))
    }

    fn evaluate_script_with_callback(&mut self, script: &str, callback: EvalCallback) -> Result<()> {
        let slot = Mutex::new(Some(callback));
        self.webview
            .evaluate_script_with_callback(script, move |raw: String| {
                let Some(callback) = slot.lock().take() else {
                    return;
                };
                let value = if raw.is_empty() {
                    Ok(None)
                } else {
                    serde_json::from_str::<Value>(&raw)
                        .map(Some)
                        .map_err(|e| WebViewError::Script(e.to_string()))
                };
                callback(value);
            })
            .map_err(|e| WebViewError::Script(e.to_string()))
    }
}

impl RenderSurface for WrySurface {
    fn load_url(&mut self, url: &str) -> Result<()> {
        // The engine may call the navigation handler synchronously, so the sink
        // is not locked across the call.
        self.sink.lock().load_requested(url);
        match self.webview.load_url(url) {
            Ok(()) => {
                self.sink.lock().load_accepted(url);
                Ok(())
            }
            Err(e) => {
                self.sink.lock().load_rejected();
                Err(WebViewError::NavigationFailed(e.to_string()))
            }
        }
    }

    fn load_html(&mut self, html: &str) -> Result<()> {
        self.webview
            .load_html(html)
            .map_err(|e| WebViewError::NavigationFailed(e.to_string()))?;
        self.sink.lock().html_load_accepted();
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.webview.url().ok()
    }

    fn set_visible(&mut self, visible: bool) {
        if let Err(e) = self.webview.set_visible(visible) {
            log::warn!("failed to change webview visibility: {}", e);
        }
    }

    fn set_popups_enabled(&mut self, enabled: bool) {
        self.popups.store(enabled, Ordering::SeqCst);
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        self.sink.lock().drain()
    }
}
