//! Signal-once cancellation.
//!
//! A [`Canceller`] fires once; every [`Cancellation`] observes it. The
//! signal is the disconnection of a channel nobody ever sends on, so it can
//! be selected on next to other crossbeam channels.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Creates a linked canceller and cancellation.
#[must_use]
pub fn cancellation() -> (Canceller, Cancellation) {
    let (tx, rx) = bounded::<()>(0);
    (
        Canceller {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        Cancellation { rx },
    )
}

/// Fires the cancellation signal.
///
/// Clones share the signal. Dropping every clone also fires it.
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl Canceller {
    /// Fires the signal. Further calls do nothing.
    pub fn cancel(&self) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(tx);
    }

    /// Returns true once [`Canceller::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

/// Observes the cancellation signal.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: Receiver<()>,
}

impl Cancellation {
    /// Returns true once the signal has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Blocks until the signal fires.
    pub fn wait(&self) {
        let _ = self.rx.recv();
    }

    /// Blocks until the signal fires or `timeout` elapses. Returns true if it fired.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Disconnected))
    }

    /// Channel that disconnects when the signal fires, for `select!`.
    pub(crate) const fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_not_cancelled_initially() {
        let (canceller, cancellation) = cancellation();
        assert!(!canceller.is_cancelled());
        assert!(!cancellation.is_cancelled());
        assert!(!cancellation.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_cancel_wakes_waiters() {
        let (canceller, cancellation) = cancellation();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let c = cancellation.clone();
                thread::spawn(move || c.wait())
            })
            .collect();

        canceller.cancel();
        for w in waiters {
            w.join().unwrap();
        }
        assert!(cancellation.is_cancelled());
        assert!(canceller.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (canceller, cancellation) = cancellation();
        let other = canceller.clone();
        canceller.cancel();
        other.cancel();
        assert!(cancellation.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_dropping_all_cancellers_fires() {
        let (canceller, cancellation) = cancellation();
        let clone = canceller.clone();
        drop(canceller);
        assert!(!cancellation.is_cancelled());
        drop(clone);
        assert!(cancellation.is_cancelled());
    }
}
