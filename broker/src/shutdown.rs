use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::BrokerError;

/// Writer half of the process-scoped termination flag shared by every plane thread.
///
/// A trigger/signal split backed by a plain `Arc<AtomicBool>`
/// rather than a future: every plane here suspends inside `zmq::poll`, not an executor, so there
/// is nothing for a futures-oriented signal to wake.
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
    abort: Arc<AtomicBool>,
}

/// Reader half, cheaply cloned and handed to every plane thread.
#[derive(Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    abort: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            triggered: self.triggered.clone(),
            abort: self.abort.clone(),
        }
    }

    /// First call asks every plane to wind down; a second call (e.g. a repeated Ctrl-C while the
    /// supervisor is already joining) asks the supervisor to stop waiting on stragglers.
    pub fn trigger(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            self.abort.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Install a `Ctrl-C` handler that calls [`Shutdown::trigger`] in response to the
    /// process's interrupt signal.
    pub fn wire_ctrlc(&self) -> Result<(), BrokerError> {
        let triggered = self.triggered.clone();
        let abort = self.abort.clone();
        ctrlc::set_handler(move || {
            if triggered.swap(true, Ordering::SeqCst) {
                abort.store(true, Ordering::SeqCst);
            }
        })?;
        Ok(())
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_observes_trigger() {
        let shutdown = Shutdown::new();
        let signal = shutdown.signal();
        assert!(!signal.is_triggered());
        shutdown.trigger();
        assert!(signal.is_triggered());
    }

    #[test]
    fn second_trigger_sets_abort() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_aborted());
        shutdown.trigger();
        assert!(!shutdown.is_aborted());
        shutdown.trigger();
        assert!(shutdown.is_aborted());
    }
}
