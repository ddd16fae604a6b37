//! # Shutdown Signal
//!
//! A one-shot broadcast stop signal.
//!
//! ## Design
//!
//! The signal owns the only `Sender` of a zero-capacity channel and never
//! sends on it. Triggering drops the sender, which disconnects the channel,
//! which wakes every receiver at once:
//!
//! ```text
//! trigger() ──drop(Sender)──> every recv() / select! returns Disconnected
//! ```
//!
//! A blocked thread can therefore `select!` on its work channel and
//! [`Shutdown::listener`] and tell "woken for real work" apart from
//! "woken because the game is over" without polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

/// Cloneable handle to a shared stop signal.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

struct ShutdownInner {
    triggered: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    listener: Receiver<()>,
}

impl Shutdown {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, listener) = bounded(0);
        Self {
            inner: Arc::new(ShutdownInner {
                triggered: AtomicBool::new(false),
                trigger: Mutex::new(Some(sender)),
                listener,
            }),
        }
    }

    /// Triggers the signal. Idempotent.
    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::Release);
        self.inner.trigger.lock().take();
    }

    /// Returns true once [`Shutdown::trigger`] has been called.
    #[inline]
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) when the signal fires.
    ///
    /// Use it as one arm of a `crossbeam_channel::select!`.
    #[must_use]
    pub fn listener(&self) -> &Receiver<()> {
        &self.inner.listener
    }

    /// Sleeps for `timeout` unless the signal fires first.
    ///
    /// Returns true if woken by the signal.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.inner.listener.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_triggered(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shutdown")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}
