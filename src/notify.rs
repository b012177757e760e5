//! Write-completed notifications (the fasync / SIGIO hook).
//!
//! Every successful non-empty write publishes a [`WriteEvent`] on a tokio
//! broadcast channel. Subscribers that fall behind miss events rather than
//! slow writers down.

use tokio::sync::broadcast;
use tracing::trace;

/// Queue depth per subscriber.
pub const WRITE_EVENT_CAPACITY: usize = 64;

/// Published after a write completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteEvent {
    /// Bytes the write stored.
    pub written: usize,
    /// Bytes buffered once the write completed.
    pub available: usize,
}

/// Broadcast sender shared by all sessions of a channel.
#[derive(Debug)]
pub(crate) struct WriteEvents {
    sender: broadcast::Sender<WriteEvent>,
}

impl WriteEvents {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(WRITE_EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<WriteEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish an event; having no subscribers is not an error.
    pub(crate) fn publish(&self, event: WriteEvent) {
        match self.sender.send(event) {
            Ok(receivers) => trace!(
                receivers,
                written = event.written,
                available = event.available,
                "Write event published"
            ),
            Err(_) => trace!("No write event subscribers"),
        }
    }
}
