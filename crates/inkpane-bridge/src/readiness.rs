//! Page readiness and the single-slot pending initialization.

/// Whether the guest page can take calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageReadiness {
    #[default]
    Unloaded,
    Loading,
    Ready,
}

impl PageReadiness {
    /// Any load request, including a reload of a ready page.
    pub fn begin_load(&mut self) {
        *self = PageReadiness::Loading;
    }

    /// Successful completion. Returns true if this made the page ready.
    pub fn complete(&mut self) -> bool {
        if *self == PageReadiness::Loading {
            *self = PageReadiness::Ready;
            true
        } else {
            false
        }
    }

    /// Failure or cancellation of the current load.
    pub fn fail(&mut self) {
        if *self == PageReadiness::Loading {
            *self = PageReadiness::Unloaded;
        }
    }

    pub fn is_ready(self) -> bool {
        self == PageReadiness::Ready
    }
}

/// Content the guest editor is initialized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub text: String,
    pub language: String,
    pub theme: String,
}

/// The most recent [`InitRequest`], re-applied at most once per load completion.
#[derive(Debug, Clone, Default)]
pub struct PendingInit {
    request: Option<InitRequest>,
    armed: bool,
}

impl PendingInit {
    /// Replace the stored request.
    pub fn store(&mut self, request: InitRequest) {
        self.request = Some(request);
    }

    /// Store `request` only if nothing has been stored yet.
    pub fn seed(&mut self, request: InitRequest) {
        if self.request.is_none() {
            self.request = Some(request);
        }
    }

    /// Keep the stored text in step with later `set_text` calls.
    pub fn update_text(&mut self, text: &str) {
        if let Some(request) = self.request.as_mut() {
            request.text = text.to_string();
        }
    }

    /// Allow one re-apply. Called once per load completion.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Drop an armed re-apply, e.g. after the request was applied directly.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// The request to re-apply, if armed. Disarms the slot; the request itself is
    /// kept for later reloads.
    pub fn take_for_apply(&mut self) -> Option<InitRequest> {
        if std::mem::take(&mut self.armed) {
            self.request.clone()
        } else {
            None
        }
    }

    pub fn current(&self) -> Option<&InitRequest> {
        self.request.as_ref()
    }
}
