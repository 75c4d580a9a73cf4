//! Cached worker pool: threads are spawned on demand, reused while busy
//! traffic continues, and retire after sitting idle for the keep-alive.

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    receiver: Mutex<Receiver<Job>>,
    /// Jobs sent but not yet taken by a worker.
    queued: AtomicUsize,
    idle: AtomicUsize,
    live: AtomicUsize,
    spawned: AtomicUsize,
    keep_alive: Duration,
    name: String,
}

pub(crate) struct WorkerPool {
    sender: Sender<Job>,
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub(crate) fn new(name: impl Into<String>, keep_alive: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            shared: Arc::new(Shared {
                receiver: Mutex::new(receiver),
                queued: AtomicUsize::new(0),
                idle: AtomicUsize::new(0),
                live: AtomicUsize::new(0),
                spawned: AtomicUsize::new(0),
                keep_alive,
                name: name.into(),
            }),
        }
    }

    /// Queue a job, spawning a worker unless an idle one is left for it.
    pub(crate) fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let queued = self.shared.queued.fetch_add(1, Ordering::SeqCst) + 1;
        // Send before checking idleness: a worker that retires after this point
        // re-checks the queue once it is no longer counted as idle.
        if self.sender.send(Box::new(job)).is_err() {
            self.shared.queued.fetch_sub(1, Ordering::SeqCst);
            log::error!("{}: job queue closed", self.shared.name);
            return;
        }
        if self.shared.idle.load(Ordering::SeqCst) < queued {
            self.spawn_worker();
        }
    }

    /// Number of worker threads currently alive.
    pub(crate) fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    fn spawn_worker(&self) {
        let shared = Arc::clone(&self.shared);
        let id = shared.spawned.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}-{}", shared.name, id);
        shared.live.fetch_add(1, Ordering::SeqCst);

        let worker_shared = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(worker_shared));
        if let Err(e) = spawned {
            shared.live.fetch_sub(1, Ordering::SeqCst);
            log::error!("failed to spawn worker {}: {}", name, e);
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        shared.idle.fetch_add(1, Ordering::SeqCst);
        let next = shared.receiver.lock().recv_timeout(shared.keep_alive);
        shared.idle.fetch_sub(1, Ordering::SeqCst);

        let job = match next {
            Ok(job) => job,
            Err(RecvTimeoutError::Timeout) => match shared.receiver.lock().try_recv() {
                Ok(job) => job,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            },
            Err(RecvTimeoutError::Disconnected) => break,
        };
        shared.queued.fetch_sub(1, Ordering::SeqCst);

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!("{}: worker job panicked", shared.name);
        }
    }
    shared.live.fetch_sub(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn runs_jobs_on_named_threads() {
        let pool = WorkerPool::new("test-pool", Duration::from_secs(5));
        let (tx, rx) = channel();
        for i in 0..8 {
            let tx = tx.clone();
            pool.execute(move || {
                let name = thread::current().name().unwrap_or_default().to_string();
                tx.send((i, name)).unwrap();
            });
        }
        let mut seen: Vec<_> = (0..8)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        seen.sort();
        assert_eq!(seen.len(), 8);
        assert!(seen.iter().all(|(_, name)| name.starts_with("test-pool-")));
    }

    #[test]
    fn survives_panicking_jobs() {
        let pool = WorkerPool::new("panic-pool", Duration::from_secs(5));
        pool.execute(|| panic!("boom"));
        let (tx, rx) = channel();
        pool.execute(move || tx.send(42).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn burst_gets_its_own_workers_while_one_is_idle() {
        let pool = WorkerPool::new("burst-pool", Duration::from_secs(5));
        let (tx, rx) = channel();
        pool.execute(move || tx.send(()).unwrap());
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(pool.live_workers(), 1);

        // Each job waits for all three to be running at once; on a single
        // worker they would run one after another and time out.
        let active = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = channel();
        for _ in 0..3 {
            let active = Arc::clone(&active);
            let tx = tx.clone();
            pool.execute(move || {
                active.fetch_add(1, Ordering::SeqCst);
                let deadline = std::time::Instant::now() + Duration::from_secs(2);
                while active.load(Ordering::SeqCst) < 3 && std::time::Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(5));
                }
                tx.send(active.load(Ordering::SeqCst)).unwrap();
            });
        }
        let seen: Vec<usize> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
            .collect();
        assert_eq!(seen, vec![3, 3, 3]);
        assert!(pool.live_workers() >= 3);
    }

    #[test]
    fn idle_workers_retire() {
        let pool = WorkerPool::new("retire-pool", Duration::from_millis(50));
        let (tx, rx) = channel();
        pool.execute(move || tx.send(()).unwrap());
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while pool.live_workers() > 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(pool.live_workers(), 0);
    }
}
