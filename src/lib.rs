//! Embeds a web-based code editor in a desktop application.
//!
//! - [`server`]: loopback HTTP server for the packaged editor bundle
//! - [`webview`]: rendering surfaces and navigation mediation
//! - [`bridge`]: readiness-gated host/guest calls
//! - [`config`]: `inkpane.toml` and environment configuration

pub use inkpane_bridge as bridge;
pub use inkpane_config as config;
pub use inkpane_server as server;
pub use inkpane_webview as webview;

pub use inkpane_bridge::BridgeHost;
pub use inkpane_config::InkpaneConfig;
pub use inkpane_server::{ResourceServer, ShutdownGuard};
pub use inkpane_webview::{NavigationMediator, RenderSurface, RenderSurfaceMode};
