//! The host side of the editor bridge.

use crate::marshal::{GuestCall, Severity};
use crate::readiness::{InitRequest, PageReadiness, PendingInit};
use inkpane_server::{AssetRoot, DEFAULT_DOCUMENT, ResourceServer};
use inkpane_webview::{
    BLANK_LOCATION, LoadState, NavigationMediator, RenderSurface, RenderSurfaceMode,
    SurfaceEvent, UiQueue, Waker, WebViewError,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::thread;

/// Global the bridge installs for guest-to-host notifications.
pub const HOST_OBJECT: &str = "InkpaneHost";

const ON_EDITOR_READY: &str = "onEditorReady";
const ON_SAVE_REQUESTED: &str = "onSaveRequested";

/// Methods of [`HOST_OBJECT`] the guest may call. Native surfaces should define
/// the object at document start (see `SurfaceBuilder::with_host_object`) so
/// notifications sent before the load completes are not lost.
pub const HOST_METHODS: &[&str] = &[ON_EDITOR_READY, ON_SAVE_REQUESTED];

pub const DEFAULT_LANGUAGE: &str = "plaintext";
pub const DEFAULT_THEME: &str = "vs";

const MISSING_BUNDLE: &str = "Missing editor resources. Ensure the editor bundle (index.html \
     and the vs/ directory) is present under the asset root";

type SaveHandler = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeTask {
    ApplyPendingInit,
}

#[derive(Debug, Deserialize)]
struct HostCall {
    object: String,
    method: String,
}

/// Drives the guest editor through a [`NavigationMediator`].
///
/// Guest calls are no-ops until the page is [`PageReadiness::Ready`]; `load`
/// is remembered and re-applied once on the next tick after readiness. Without
/// a `load`, readiness initializes an empty editor with the defaults. All
/// methods run on the UI-owning thread; guest script failures are logged and
/// never surface as errors.
pub struct BridgeHost<S: RenderSurface> {
    mediator: NavigationMediator<S>,
    readiness: PageReadiness,
    pending: PendingInit,
    queue: UiQueue<BridgeTask>,
    default_language: String,
    default_theme: String,
    save_handler: Option<SaveHandler>,
    ready_listener: Option<Box<dyn FnMut()>>,
}

impl<S: RenderSurface> BridgeHost<S> {
    /// Wrap `mediator`. In inline mode the editor page is loaded right away.
    pub fn new(mediator: NavigationMediator<S>) -> Self {
        let mut host = Self {
            mediator,
            readiness: PageReadiness::Unloaded,
            pending: PendingInit::default(),
            queue: UiQueue::new(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            default_theme: DEFAULT_THEME.to_string(),
            save_handler: None,
            ready_listener: None,
        };
        if host.mode() == RenderSurfaceMode::Inline {
            host.open_editor_page(None);
        }
        host
    }

    /// Use other defaults for blank language and theme arguments.
    pub fn with_defaults(mut self, language: &str, theme: &str) -> Self {
        if !language.trim().is_empty() {
            self.default_language = language.trim().to_string();
        }
        if !theme.trim().is_empty() {
            self.default_theme = theme.trim().to_string();
        }
        self
    }

    /// Called with the editor text whenever a save is requested. Runs on a
    /// background thread.
    pub fn with_save_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.save_handler = Some(Arc::new(handler));
        self
    }

    /// Called on the UI thread when the guest reports its editor is ready.
    pub fn on_editor_ready<F>(&mut self, listener: F)
    where
        F: FnMut() + 'static,
    {
        self.ready_listener = Some(Box::new(listener));
    }

    pub fn set_waker(&mut self, waker: Option<Waker>) {
        self.queue.set_waker(waker.clone());
        self.mediator.set_waker(waker);
    }

    pub fn mode(&self) -> RenderSurfaceMode {
        self.mediator.mode()
    }

    pub fn readiness(&self) -> PageReadiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// The init request that will be re-applied on the next readiness.
    pub fn pending_init(&self) -> Option<&InitRequest> {
        self.pending.current()
    }

    pub fn mediator(&self) -> &NavigationMediator<S> {
        &self.mediator
    }

    pub fn mediator_mut(&mut self) -> &mut NavigationMediator<S> {
        &mut self.mediator
    }

    pub fn surface(&self) -> &S {
        self.mediator.surface()
    }

    pub fn surface_mut(&mut self) -> &mut S {
        self.mediator.surface_mut()
    }

    /// Initialize the editor with `text`. Blank language and theme fall back to
    /// the defaults.
    ///
    /// Inline mode applies immediately when ready, otherwise on readiness. Redirect
    /// mode navigates to the default document with the content in the query, for
    /// the guest to bootstrap from.
    pub fn load(&mut self, text: &str, language: Option<&str>, theme: Option<&str>) {
        let request = InitRequest {
            text: text.to_string(),
            language: non_blank(language).unwrap_or(self.default_language.as_str()).to_string(),
            theme: non_blank(theme).unwrap_or(self.default_theme.as_str()).to_string(),
        };
        self.pending.store(request.clone());

        match self.mode() {
            RenderSurfaceMode::Redirect => {
                let query = bootstrap_query(&request);
                self.open_editor_page(Some(&query));
            }
            RenderSurfaceMode::Inline => {
                if self.is_ready() {
                    self.pending.disarm();
                    self.apply_init(&request);
                }
            }
        }
    }

    pub fn set_text(&mut self, text: &str) {
        self.pending.update_text(text);
        self.exec(GuestCall::new("setText").string(text).render());
    }

    pub fn set_line_numbers(&mut self, show: bool) {
        self.exec(GuestCall::new("setLineNumbers").boolean(show).render());
    }

    /// Gutter visibility; `true` when unknown.
    pub fn is_line_numbers_visible(&mut self) -> bool {
        let script = GuestCall::new("isLineNumbersVisible").render_query("true");
        match self.eval(&script) {
            Some(Value::Bool(visible)) => visible,
            _ => true,
        }
    }

    /// Editor content; empty when not ready or when extraction fails.
    pub fn get_text(&mut self) -> String {
        let script = GuestCall::new("getText").render_query("''");
        self.eval(&script).map(text_of).unwrap_or_default()
    }

    /// [`get_text`](Self::get_text) for backends without synchronous evaluation.
    pub fn get_text_async<F>(&mut self, callback: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        if !self.is_ready() {
            callback(String::new());
            return;
        }
        let script = GuestCall::new("getText").render_query("''");
        let result = self.mediator.surface_mut().evaluate_script_with_callback(
            &script,
            Box::new(move |result| {
                let text = match result {
                    Ok(value) => value.map(text_of).unwrap_or_default(),
                    Err(e) => {
                        log::warn!("guest getText failed: {}", e);
                        String::new()
                    }
                };
                callback(text);
            }),
        );
        if let Err(e) = result {
            log::warn!("guest getText could not be scheduled: {}", e);
        }
    }

    /// [`is_line_numbers_visible`](Self::is_line_numbers_visible) for backends
    /// without synchronous evaluation.
    pub fn is_line_numbers_visible_async<F>(&mut self, callback: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        if !self.is_ready() {
            callback(true);
            return;
        }
        let script = GuestCall::new("isLineNumbersVisible").render_query("true");
        let result = self.mediator.surface_mut().evaluate_script_with_callback(
            &script,
            Box::new(move |result| match result {
                Ok(Some(Value::Bool(visible))) => callback(visible),
                _ => callback(true),
            }),
        );
        if let Err(e) = result {
            log::warn!("guest isLineNumbersVisible could not be scheduled: {}", e);
        }
    }

    /// Annotate `line`. Bounds are the guest's concern.
    pub fn create_marker(&mut self, line: i64, message: Option<&str>, severity: Option<&str>) {
        let call = GuestCall::new("createMarker")
            .int(line)
            .string(message.unwrap_or(""))
            .string(Severity::lenient(severity).as_str());
        self.exec(call.render());
    }

    /// Annotate `length` characters starting at `offset`.
    pub fn create_marker_by_offset(
        &mut self,
        offset: i64,
        length: i64,
        message: Option<&str>,
        severity: Option<&str>,
    ) {
        let call = GuestCall::new("createMarkerByOffset")
            .int(offset)
            .int(length)
            .string(message.unwrap_or(""))
            .string(Severity::lenient(severity).as_str());
        self.exec(call.render());
    }

    /// Ask the guest to connect to a language server. A blank endpoint does nothing.
    pub fn connect_lsp(&mut self, endpoint: &str, language_id: Option<&str>) {
        if endpoint.trim().is_empty() {
            return;
        }
        let call = GuestCall::new("connectLsp")
            .string(endpoint)
            .string(language_id.unwrap_or(""));
        self.exec(call.render_optional());
    }

    /// Hand the current text to the save handler, if any.
    pub fn request_save(&mut self) {
        let Some(handler) = self.save_handler.clone() else {
            log::debug!("save requested without a save handler");
            return;
        };
        self.get_text_async(move |text| {
            let spawned = thread::Builder::new()
                .name("inkpane-save".to_string())
                .spawn(move || handler(text));
            if let Err(e) = spawned {
                log::error!("failed to spawn save thread: {}", e);
            }
        });
    }

    /// One UI tick: apply work deferred by the previous tick, let the mediator
    /// run, then react to the surface's events. Returns the events.
    pub fn tick(&mut self) -> Vec<SurfaceEvent> {
        for task in self.queue.drain() {
            match task {
                BridgeTask::ApplyPendingInit => {
                    if let Some(request) = self.pending.take_for_apply() {
                        self.apply_init(&request);
                    }
                }
            }
        }

        let events = self.mediator.tick();
        for event in &events {
            self.handle_event(event);
        }
        events
    }

    fn handle_event(&mut self, event: &SurfaceEvent) {
        match event {
            SurfaceEvent::LoadStateChanged(LoadState::Scheduled) => self.readiness.begin_load(),
            SurfaceEvent::LoadStateChanged(LoadState::Succeeded) => self.page_loaded(),
            SurfaceEvent::LoadStateChanged(LoadState::Failed | LoadState::Cancelled) => {
                self.readiness.fail()
            }
            SurfaceEvent::HostMessage(message) => self.host_message(message),
            _ => {}
        }
    }

    fn page_loaded(&mut self) {
        // Only the guest page itself counts; blank steers and diagnostic markup do not.
        if self.mode() == RenderSurfaceMode::Redirect {
            return;
        }
        let is_guest = matches!(
            self.mediator.surface().current_url(),
            Some(url) if url != BLANK_LOCATION
        );
        if !is_guest {
            return;
        }

        if let Err(e) = self
            .mediator
            .surface_mut()
            .install_host_object(HOST_OBJECT, HOST_METHODS)
        {
            log::warn!("failed to install {}: {}", HOST_OBJECT, e);
        }
        if self.readiness.complete() {
            let fallback = self.default_request();
            self.pending.seed(fallback);
            self.pending.arm();
            self.queue.post(BridgeTask::ApplyPendingInit);
        }
    }

    fn host_message(&mut self, message: &str) {
        let call: HostCall = match serde_json::from_str(message) {
            Ok(call) => call,
            Err(e) => {
                log::warn!("ignoring malformed host message {:?}: {}", message, e);
                return;
            }
        };
        if call.object != HOST_OBJECT {
            return;
        }
        match call.method.as_str() {
            ON_EDITOR_READY => {
                log::info!("guest editor ready");
                if let Some(listener) = self.ready_listener.as_mut() {
                    listener();
                }
            }
            ON_SAVE_REQUESTED => self.request_save(),
            other => log::debug!("unhandled host call {}", other),
        }
    }

    fn open_editor_page(&mut self, query: Option<&str>) {
        let server = Arc::clone(self.mediator.server());
        let root = server.root();
        if !bundle_present(&server) {
            log::error!("editor bundle missing from {}", server.source().describe());
            if let Err(e) = self.mediator.load_html(&missing_bundle_page()) {
                log::warn!("failed to show missing-bundle page: {}", e);
            }
            return;
        }

        let url = format!("{}{}", root.default_document_url(), query.unwrap_or(""));
        self.readiness.begin_load();
        if let Err(e) = self.mediator.load_url(&url) {
            log::warn!("failed to load editor page {}: {}", url, e);
            self.readiness.fail();
        }
    }

    fn default_request(&self) -> InitRequest {
        InitRequest {
            text: String::new(),
            language: self.default_language.clone(),
            theme: self.default_theme.clone(),
        }
    }

    fn apply_init(&mut self, request: &InitRequest) {
        let call = GuestCall::new("init")
            .string(&request.text)
            .string(&request.language)
            .string(&request.theme);
        self.exec(call.render());
    }

    fn exec(&mut self, script: String) {
        if !self.is_ready() {
            return;
        }
        if let Err(e) = self.mediator.surface_mut().execute_script(&script) {
            log::warn!("guest script failed: {}", e);
        }
    }

    fn eval(&mut self, script: &str) -> Option<Value> {
        if !self.is_ready() {
            return None;
        }
        match self.mediator.surface_mut().evaluate_script(script) {
            Ok(value) => value,
            Err(WebViewError::Unsupported(what)) => {
                log::debug!("{} unavailable, using default", what);
                None
            }
            Err(e) => {
                log::warn!("guest evaluation failed: {}", e);
                None
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn bundle_present(server: &ResourceServer) -> bool {
    let root: &AssetRoot = server.root();
    server
        .source()
        .contains(&root.resolve(&format!("/{}", DEFAULT_DOCUMENT)))
}

/// `?language=..&theme=..&text=..`, each value URL-encoded.
pub fn bootstrap_query(request: &InitRequest) -> String {
    format!(
        "?language={}&theme={}&text={}",
        urlencoding::encode(&request.language),
        urlencoding::encode(&request.theme),
        urlencoding::encode(&request.text)
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Shown in place of the editor when the bundle is missing.
pub fn missing_bundle_page() -> String {
    format!(
        "<html><body><pre>{}</pre></body></html>",
        escape_html(MISSING_BUNDLE)
    )
}
