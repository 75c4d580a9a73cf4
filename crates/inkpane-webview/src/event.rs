//! Events reported by rendering surfaces.

/// State of the surface's load worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// A load has been requested but not started.
    Scheduled,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Something the host should react to, drained from the surface on the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface's current location changed (programmatic load or in-page navigation).
    LocationChanged(String),
    /// The load worker transitioned.
    LoadStateChanged(LoadState),
    /// A guest script invoked a method on an installed host object. The payload
    /// is the JSON message produced by [`host_object_script`](crate::host_object_script).
    HostMessage(String),
}
