//! Inactivity timer that signals an implicit lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Collaborator that counts down while the session is unlocked.
///
/// `arm` is called on every transition into the unlocked state and on every
/// user activity; `disarm` on lock. Both must be cheap and non-blocking.
pub trait InactivityTimer: Send + Sync {
    fn arm(&self);

    fn disarm(&self);

    /// Inactivity window after which this timer locks, if it enforces one.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Arm with a countdown shorter than the full window, for a session that
    /// resumes after already being idle for a while.
    fn arm_for(&self, remaining: Duration) {
        let _ = remaining;
        self.arm();
    }

    /// Whether `signal` comes from the countdown that is currently armed.
    /// A signal raced by a later `arm` or `disarm` is stale and ignored.
    fn is_current(&self, signal: AutoLockFired) -> bool {
        let _ = signal;
        true
    }
}

/// Emitted when a countdown expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoLockFired {
    pub generation: u64,
}

/// Tokio-backed [`InactivityTimer`].
///
/// Each `arm` aborts the pending countdown and spawns a new one. Expiry sends
/// [`AutoLockFired`] on the channel returned from [`AutoLockTimer::new`].
pub struct AutoLockTimer {
    timeout: Duration,
    tx: mpsc::UnboundedSender<AutoLockFired>,
    generation: AtomicU64,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AutoLockTimer {
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<AutoLockFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = Self {
            timeout,
            tx,
            generation: AtomicU64::new(0),
            pending: Mutex::new(None),
        };
        (timer, rx)
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

impl InactivityTimer for AutoLockTimer {
    fn arm(&self) {
        self.arm_for(self.timeout);
    }

    fn disarm(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_pending();
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    fn arm_for(&self, remaining: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime; auto-lock not armed");
            return;
        };

        self.cancel_pending();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = self.tx.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(remaining).await;
            debug!(generation, "auto-lock countdown expired");
            let _ = tx.send(AutoLockFired { generation });
        });
        *self.pending.lock() = Some(handle);
    }

    fn is_current(&self, signal: AutoLockFired) -> bool {
        signal.generation == self.generation.load(Ordering::SeqCst)
    }
}

impl Drop for AutoLockTimer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
