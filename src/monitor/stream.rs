use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::action::Action;
use crate::error::StreamError;

/// Creates the unbuffered action channel between a monitor and its consumers.
///
/// A send completes only when a consumer takes the action, so a slow
/// consumer slows the monitor down instead of losing actions.
#[must_use]
pub fn action_channel() -> (ActionSender, ActionStream) {
    let (tx, rx) = bounded::<Action>(0);
    (ActionSender { tx }, ActionStream { rx })
}

/// Producer side of the action channel. Owned by one monitor run.
///
/// Dropping it closes the channel: consumers see [`StreamError::Closed`]
/// once the run returns.
#[derive(Debug)]
pub struct ActionSender {
    tx: Sender<Action>,
}

impl ActionSender {
    pub(crate) const fn sender(&self) -> &Sender<Action> {
        &self.tx
    }
}

/// Consumer side of the action channel.
///
/// Clones share the stream; each action goes to exactly one clone.
#[derive(Debug, Clone)]
pub struct ActionStream {
    rx: Receiver<Action>,
}

impl ActionStream {
    /// Receive the next action (blocking).
    pub fn recv(&self) -> Result<Action, StreamError> {
        self.rx.recv().map_err(|_| StreamError::Closed)
    }

    /// Receive the next action with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Action, StreamError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            #[allow(clippy::cast_possible_truncation)]
            RecvTimeoutError::Timeout => StreamError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            },
            RecvTimeoutError::Disconnected => StreamError::Closed,
        })
    }

    /// Blocking iterator that ends when the monitor run returns.
    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.rx.iter()
    }
}

impl IntoIterator for ActionStream {
    type Item = Action;
    type IntoIter = crossbeam_channel::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.rx.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_send_waits_for_consumer() {
        let (tx, stream) = action_channel();
        assert!(tx.sender().try_send(Action::Clockwise).is_err());

        let consumer = thread::spawn(move || stream.recv());
        tx.sender().send(Action::Clockwise).unwrap();
        assert_eq!(consumer.join().unwrap().unwrap(), Action::Clockwise);
    }

    #[test]
    fn test_closed_after_sender_drop() {
        let (tx, stream) = action_channel();
        drop(tx);
        assert!(stream.recv().unwrap_err().is_closed());
        assert_eq!(stream.iter().count(), 0);
    }

    #[test]
    fn test_recv_timeout() {
        let (_tx, stream) = action_channel();
        let err = stream.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, StreamError::Timeout { duration_ms: 5 }));
    }
}
