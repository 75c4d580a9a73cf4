//! The loopback HTTP server exposing one packaged asset subtree.

use crate::assets::{AssetSource, EmbeddedAssets};
use crate::error::{Result, ServerError};
use crate::pool::WorkerPool;
use crate::request::{AssetResponse, respond};
use crate::root::AssetRoot;
use parking_lot::Mutex;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server, StatusCode};

const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Settings for a [`ResourceServer`].
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub bind_host: String,
    pub worker_keep_alive: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            worker_keep_alive: Duration::from_secs(60),
        }
    }
}

struct Running {
    server: Arc<Server>,
    port: u16,
    shutdown: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

/// Process-scoped loopback server for the editor bundle.
///
/// Construct once at startup and share it as an `Arc<ResourceServer>`. The
/// listener is bound lazily by the first [`start`](Self::start) and released by
/// [`stop`](Self::stop) or when the last handle is dropped.
pub struct ResourceServer {
    root: AssetRoot,
    source: Arc<dyn AssetSource>,
    options: ServerOptions,
    state: Mutex<Option<Running>>,
}

impl ResourceServer {
    pub fn new(root: AssetRoot, source: Arc<dyn AssetSource>, options: ServerOptions) -> Self {
        Self {
            root,
            source,
            options,
            state: Mutex::new(None),
        }
    }

    /// Server for the embedded editor bundle with default options.
    pub fn embedded() -> Self {
        Self::new(
            AssetRoot::editor(),
            Arc::new(EmbeddedAssets),
            ServerOptions::default(),
        )
    }

    pub fn root(&self) -> &AssetRoot {
        &self.root
    }

    pub fn source(&self) -> &Arc<dyn AssetSource> {
        &self.source
    }

    /// Bind the listener if needed and return the bound port.
    ///
    /// Concurrent first calls are serialized; exactly one listener is ever bound
    /// per running period and all callers observe its port.
    pub fn start(&self) -> Result<u16> {
        let mut state = self.state.lock();
        if let Some(running) = state.as_ref() {
            return Ok(running.port);
        }

        let addr = format!("{}:0", self.options.bind_host);
        let server = Server::http(addr.as_str()).map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .ok_or(ServerError::NoAddress)?;

        let server = Arc::new(server);
        let shutdown = Arc::new(AtomicBool::new(false));
        let pool = WorkerPool::new("inkpane-asset-worker", self.options.worker_keep_alive);

        let acceptor = {
            let server = Arc::clone(&server);
            let shutdown = Arc::clone(&shutdown);
            let root = self.root.clone();
            let source = Arc::clone(&self.source);
            thread::Builder::new()
                .name("inkpane-asset-acceptor".to_string())
                .spawn(move || accept_loop(server, shutdown, pool, root, source))
                .map_err(|e| ServerError::Spawn(e.to_string()))?
        };

        log::info!(
            "resource server started at http://{}:{}/ serving {} from {}",
            self.options.bind_host,
            port,
            self.root.prefix(),
            self.source.describe()
        );

        *state = Some(Running {
            server,
            port,
            shutdown,
            acceptor: Some(acceptor),
        });
        Ok(port)
    }

    /// Release the listener and its workers. Safe to call repeatedly and from any thread.
    pub fn stop(&self) {
        let Some(mut running) = self.state.lock().take() else {
            return;
        };
        running.shutdown.store(true, Ordering::SeqCst);
        running.server.unblock();
        if let Some(acceptor) = running.acceptor.take() {
            if acceptor.thread().id() != thread::current().id() {
                let _ = acceptor.join();
            }
        }
        log::info!("resource server on port {} stopped", running.port);
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Bound port, defined iff the server is running.
    pub fn port(&self) -> Option<u16> {
        self.state.lock().as_ref().map(|r| r.port)
    }

    /// Absolute loopback URL for an asset path relative to the root, starting the
    /// server on demand.
    pub fn url_for(&self, asset_path: &str) -> Result<String> {
        let port = self.start()?;
        let path = if asset_path.starts_with('/') {
            asset_path.to_string()
        } else {
            format!("/{}", asset_path)
        };
        Ok(format!("http://{}:{}{}", self.options.bind_host, port, path))
    }

    /// Guard that stops this server when dropped.
    pub fn install_shutdown_guard(self: &Arc<Self>) -> ShutdownGuard {
        ShutdownGuard::new(Arc::clone(self))
    }
}

impl Drop for ResourceServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Stops the shared server when dropped, e.g. at the end of `main`.
pub struct ShutdownGuard {
    server: Arc<ResourceServer>,
}

impl ShutdownGuard {
    pub fn new(server: Arc<ResourceServer>) -> Self {
        Self { server }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.server.stop();
    }
}

fn accept_loop(
    server: Arc<Server>,
    shutdown: Arc<AtomicBool>,
    pool: WorkerPool,
    root: AssetRoot,
    source: Arc<dyn AssetSource>,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(ACCEPT_POLL) {
            Ok(Some(request)) => {
                let root = root.clone();
                let source = Arc::clone(&source);
                pool.execute(move || handle(request, source.as_ref(), &root));
            }
            Ok(None) => {}
            Err(e) => {
                if !shutdown.load(Ordering::SeqCst) {
                    log::error!("resource server accept failed: {}", e);
                }
                break;
            }
        }
    }
    log::debug!("acceptor exiting, {} workers still alive", pool.live_workers());
}

fn handle(request: Request, source: &dyn AssetSource, root: &AssetRoot) {
    let target = request.url().to_string();
    let response = panic::catch_unwind(AssertUnwindSafe(|| respond(source, root, &target)))
        .unwrap_or_else(|_| {
            log::error!("request handler panicked for {}", target);
            AssetResponse::internal_error()
        });
    if let Err(e) = request.respond(to_http(response)) {
        log::debug!("failed to write response for {}: {}", target, e);
    }
}

fn to_http(response: AssetResponse) -> Response<Cursor<Vec<u8>>> {
    let mut http = Response::from_data(response.body).with_status_code(StatusCode(response.status));
    if let Ok(header) = Header::from_bytes("Content-Type", response.content_type.as_bytes()) {
        http.add_header(header);
    }
    for (name, value) in response.headers {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            http.add_header(header);
        }
    }
    http
}
