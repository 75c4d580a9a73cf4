//! Readiness-gated bridge between host code and the guest editor page.
//!
//! [`BridgeHost`] owns the rendering surface through a
//! [`NavigationMediator`](inkpane_webview::NavigationMediator) and turns editor
//! operations into guarded calls on `window.InkpaneEditor`. Calls made before the
//! page is ready are dropped, except `load`, which is kept as the pending
//! initialization and applied once readiness is observed.
//!
//! The guest reports back through `window.InkpaneHost`, installed by the bridge
//! on every successful page load. Native surfaces also define it at document
//! start from [`HOST_OBJECT`] and [`HOST_METHODS`].

mod host;
mod marshal;
mod readiness;

pub use host::{
    BridgeHost, DEFAULT_LANGUAGE, DEFAULT_THEME, HOST_METHODS, HOST_OBJECT, bootstrap_query,
    missing_bundle_page,
};
pub use marshal::{CALL_SURFACE, GuestCall, Severity, js_string, unescape_js_string};
pub use readiness::{InitRequest, PageReadiness, PendingInit};
