//! A scripted stand-in for the guest editor page.

#![allow(dead_code)]

use inkpane_bridge::{BridgeHost, CALL_SURFACE, unescape_js_string};
use inkpane_server::{AssetSource, ResourceServer};
use inkpane_webview::{
    HeadlessSurface, NavigationMediator, RecordingViewer, RenderSurfaceMode, WebViewError,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
}

#[derive(Debug)]
pub struct GuestState {
    pub text: String,
    pub language: String,
    pub theme: String,
    pub line_numbers: bool,
    pub answers_line_number_query: bool,
    pub failing: bool,
    pub calls: Vec<Call>,
}

/// Interprets the scripts the bridge emits against an in-memory editor.
#[derive(Clone)]
pub struct FakeGuest {
    state: Arc<Mutex<GuestState>>,
}

impl FakeGuest {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GuestState {
                text: String::new(),
                language: String::new(),
                theme: String::new(),
                line_numbers: true,
                answers_line_number_query: true,
                failing: false,
                calls: Vec::new(),
            })),
        }
    }

    /// A guest whose bridge script predates `isLineNumbersVisible`.
    pub fn without_line_number_query() -> Self {
        let guest = Self::new();
        guest.state.lock().answers_line_number_query = false;
        guest
    }

    /// A guest on which every script throws.
    pub fn failing() -> Self {
        let guest = Self::new();
        guest.state.lock().failing = true;
        guest
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, GuestState> {
        self.state.lock()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn surface(&self) -> HeadlessSurface {
        let state = Arc::clone(&self.state);
        HeadlessSurface::new().with_responder(move |script| respond(&mut state.lock(), script))
    }

    /// Like [`surface`](Self::surface), but loads stay running until the test
    /// completes or fails them.
    pub fn manual_surface(&self) -> HeadlessSurface {
        self.surface().manual_completion()
    }
}

fn respond(state: &mut GuestState, script: &str) -> inkpane_webview::Result<Option<Value>> {
    let Some((call, fallback)) = parse_call(script) else {
        return Ok(None);
    };
    if state.failing {
        return Err(WebViewError::Script(format!("{} is not a function", call.method)));
    }
    state.calls.push(call.clone());

    let arg = |i: usize| call.args.get(i).cloned().unwrap_or(Value::Null);
    let text_arg = |i: usize| arg(i).as_str().unwrap_or_default().to_string();
    match call.method.as_str() {
        "init" => {
            state.text = text_arg(0);
            state.language = text_arg(1);
            state.theme = text_arg(2);
        }
        "setText" => state.text = text_arg(0),
        "setLineNumbers" => state.line_numbers = arg(0).as_bool().unwrap_or(true),
        "getText" => return Ok(Some(Value::String(state.text.clone()))),
        "isLineNumbersVisible" => {
            return Ok(if state.answers_line_number_query {
                Some(Value::Bool(state.line_numbers))
            } else {
                fallback
            });
        }
        _ => {}
    }
    Ok(None)
}

/// Split `... window.InkpaneEditor.method(args) [: fallback]` into its parts.
fn parse_call(script: &str) -> Option<(Call, Option<Value>)> {
    let prefix = format!("{}.", CALL_SURFACE);
    let start = script.rfind(&prefix)? + prefix.len();
    let rest = &script[start..];
    let open = rest.find('(')?;
    let method = rest[..open].to_string();
    let (args, consumed) = parse_args(&rest[open + 1..])?;
    let tail = rest[open + 1 + consumed..].trim();
    let fallback = tail.strip_prefix(':').map(|f| literal(f.trim()));
    Some((Call { method, args }, fallback))
}

fn parse_args(s: &str) -> Option<(Vec<Value>, usize)> {
    let mut args = Vec::new();
    let mut token = String::new();
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_string {
            token.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                token.push(c);
            }
            ',' | ')' => {
                if !token.trim().is_empty() {
                    args.push(literal(token.trim()));
                }
                token.clear();
                if c == ')' {
                    return Some((args, i + 1));
                }
            }
            _ => token.push(c),
        }
    }
    None
}

fn literal(token: &str) -> Value {
    let token = token.trim_end_matches(';');
    if token.starts_with('"') {
        return unescape_js_string(token).map(Value::String).unwrap_or(Value::Null);
    }
    match token {
        "''" => Value::String(String::new()),
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => other.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
    }
}

/// A bridge over a headless surface answered by `guest`.
pub fn bridge(
    mode: RenderSurfaceMode,
    guest: &FakeGuest,
) -> (BridgeHost<HeadlessSurface>, Arc<RecordingViewer>, Arc<ResourceServer>) {
    let server = Arc::new(ResourceServer::embedded());
    bridge_with_server(mode, guest, server)
}

pub fn bridge_with_source(
    mode: RenderSurfaceMode,
    guest: &FakeGuest,
    source: Arc<dyn AssetSource>,
) -> (BridgeHost<HeadlessSurface>, Arc<RecordingViewer>, Arc<ResourceServer>) {
    let server = Arc::new(ResourceServer::new(
        inkpane_server::AssetRoot::editor(),
        source,
        inkpane_server::ServerOptions::default(),
    ));
    bridge_with_server(mode, guest, server)
}

/// An inline bridge whose page loads are completed or failed by the test.
pub fn manual_bridge(guest: &FakeGuest) -> BridgeHost<HeadlessSurface> {
    let server = Arc::new(ResourceServer::embedded());
    let mediator = NavigationMediator::new(
        guest.manual_surface(),
        RenderSurfaceMode::Inline,
        server,
        RecordingViewer::new(),
    );
    BridgeHost::new(mediator)
}

fn bridge_with_server(
    mode: RenderSurfaceMode,
    guest: &FakeGuest,
    server: Arc<ResourceServer>,
) -> (BridgeHost<HeadlessSurface>, Arc<RecordingViewer>, Arc<ResourceServer>) {
    let viewer = RecordingViewer::new();
    let mediator =
        NavigationMediator::new(guest.surface(), mode, Arc::clone(&server), viewer.clone());
    (BridgeHost::new(mediator), viewer, server)
}
