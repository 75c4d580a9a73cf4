//! Deferred work for the UI-owning thread.
//!
//! Native web engines do not tolerate being re-entered from inside their own
//! callbacks, so anything destructive (such as steering the surface to a blank
//! page) is posted here and runs on the next tick instead.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

/// Called after a task is posted so the host event loop wakes up and ticks.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// FIFO of tasks owned by the UI thread.
pub struct UiQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    waker: Option<Waker>,
}

impl<T> UiQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            waker: None,
        }
    }

    pub fn with_waker(waker: Waker) -> Self {
        let mut queue = Self::new();
        queue.waker = Some(waker);
        queue
    }

    pub fn set_waker(&mut self, waker: Option<Waker>) {
        self.waker = waker;
    }

    /// Post a task for the next tick.
    pub fn post(&self, task: T) {
        // The receiver lives as long as the queue, so this cannot fail.
        let _ = self.sender.send(task);
        if let Some(waker) = &self.waker {
            waker();
        }
    }

    /// Take every task posted so far, in submission order. Tasks posted while the
    /// returned batch runs are left for the following tick.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T> Default for UiQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for UiQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiQueue")
            .field("has_waker", &self.waker.is_some())
            .finish()
    }
}
