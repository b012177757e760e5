//! Per-open state handed back by [`RingChannel::open`].
//!
//! A session records which directions it was opened for and whether it is
//! non-blocking. It also owns the pending-signal flag that an
//! [`Interrupter`] raises to cancel a sleeping read or write.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::channel::RingChannel;

/// Directions a session was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    /// Build from separate read/write intents; `None` when neither is set.
    pub fn from_intent(wants_read: bool, wants_write: bool) -> Option<Self> {
        match (wants_read, wants_write) {
            (true, true) => Some(AccessMode::ReadWrite),
            (true, false) => Some(AccessMode::ReadOnly),
            (false, true) => Some(AccessMode::WriteOnly),
            (false, false) => None,
        }
    }

    /// Derive from `open(2)` flags (`O_RDONLY`, `O_WRONLY`, `O_RDWR`).
    pub fn from_open_flags(flags: i32) -> Option<Self> {
        match flags & libc::O_ACCMODE {
            libc::O_RDONLY => Some(AccessMode::ReadOnly),
            libc::O_WRONLY => Some(AccessMode::WriteOnly),
            libc::O_RDWR => Some(AccessMode::ReadWrite),
            _ => None,
        }
    }

    pub fn wants_read(self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn wants_write(self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

/// An open handle on a ring channel.
///
/// Closing happens through [`RingChannel::close`] or on drop; either way the
/// channel's reader/writer counts are decremented exactly once.
pub struct OpenSession {
    channel: RingChannel,
    mode: AccessMode,
    non_blocking: bool,
    signal: Arc<AtomicBool>,
    closed: bool,
}

impl OpenSession {
    pub(crate) fn new(channel: RingChannel, mode: AccessMode, non_blocking: bool) -> Self {
        Self {
            channel,
            mode,
            non_blocking,
            signal: Arc::new(AtomicBool::new(false)),
            closed: false,
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn wants_read(&self) -> bool {
        self.mode.wants_read()
    }

    pub fn wants_write(&self) -> bool {
        self.mode.wants_write()
    }

    pub fn is_non_blocking(&self) -> bool {
        self.non_blocking
    }

    /// Toggle non-blocking mode after open (the `F_SETFL` / `O_NONBLOCK` path).
    pub fn set_non_blocking(&mut self, non_blocking: bool) {
        self.non_blocking = non_blocking;
    }

    /// The channel this session was opened on.
    pub fn channel(&self) -> &RingChannel {
        &self.channel
    }

    /// Handle another thread can use to cancel this session's sleeps.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            pending: Arc::clone(&self.signal),
            channel: self.channel.clone(),
        }
    }

    /// True when a signal is pending and not yet consumed.
    pub fn has_pending_signal(&self) -> bool {
        self.signal.load(Ordering::SeqCst)
    }

    /// Consume a pending signal.
    pub(crate) fn take_signal(&self) -> bool {
        self.signal.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn belongs_to(&self, channel: &RingChannel) -> bool {
        self.channel.same_channel(channel)
    }

    pub(crate) fn mark_closed(&mut self) {
        self.closed = true;
    }
}

impl fmt::Debug for OpenSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSession")
            .field("channel", &self.channel.name())
            .field("mode", &self.mode)
            .field("non_blocking", &self.non_blocking)
            .field("signal_pending", &self.has_pending_signal())
            .finish()
    }
}

impl Drop for OpenSession {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            self.channel.release(self.mode);
        }
    }
}

/// Delivers a signal to one session.
///
/// A read or write sleeping on behalf of that session wakes and fails with
/// [`ChannelError::Interrupted`](crate::ChannelError::Interrupted). If the
/// session is not asleep the signal stays pending until its next sleep.
#[derive(Clone)]
pub struct Interrupter {
    pending: Arc<AtomicBool>,
    channel: RingChannel,
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.pending.store(true, Ordering::SeqCst);
        self.channel.deliver_signal();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupter")
            .field("channel", &self.channel.name())
            .field("pending", &self.is_pending())
            .finish()
    }
}
