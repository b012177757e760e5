//! Bounded ring channel with pipe semantics.
//!
//! A fixed-capacity circular byte buffer shared by any number of readers
//! and writers. Reads sleep while the buffer is empty, writes sleep while it
//! is full, and both can be cancelled by an [`Interrupter`]. Storage is
//! allocated on the first open and dropped, with any unread bytes, when the
//! last session closes.
//!
//! All index and buffer updates happen under one mutex. Sleepers wait on a
//! condition variable tied to that mutex so the lock is never held while
//! asleep.
//!
//! [`Interrupter`]: crate::session::Interrupter

mod ring;
mod wait_queue;

use std::fmt;
use std::sync::Arc;
use std::task::Waker;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{ChannelError, Result};
use crate::notify::{WriteEvent, WriteEvents};
use crate::readiness::Readiness;
use crate::session::{AccessMode, OpenSession};

use ring::Ring;
use wait_queue::WaitQueue;

/// Name given to channels created without one.
pub const DEFAULT_CHANNEL_NAME: &str = "scullpipe";

/// Point-in-time view of a channel, as reported by the device status file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub name: String,
    pub capacity: usize,
    pub allocated: bool,
    pub read_pos: usize,
    pub write_pos: usize,
    pub used: usize,
    pub free: usize,
    pub readers: u32,
    pub writers: u32,
    pub readers_waiting: usize,
    pub writers_waiting: usize,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: allocated={}",
            self.name,
            if self.allocated { "yes" } else { "no" }
        )?;
        writeln!(
            f,
            "   Queues: readers waiting {}, writers waiting {}",
            self.readers_waiting, self.writers_waiting
        )?;
        writeln!(
            f,
            "   Buffer: {} bytes, rp {}, wp {}, used {}, free {}",
            self.capacity, self.read_pos, self.write_pos, self.used, self.free
        )?;
        writeln!(f, "   readers {}, writers {}", self.readers, self.writers)
    }
}

struct State {
    ring: Ring,
    nreaders: u32,
    nwriters: u32,
}

struct Shared {
    name: String,
    state: Mutex<State>,
    /// Readers sleeping on an empty buffer.
    inq: WaitQueue,
    /// Writers sleeping on a full buffer.
    outq: WaitQueue,
    events: WriteEvents,
}

/// Handle to a bounded ring channel. Clones refer to the same channel.
#[derive(Clone)]
pub struct RingChannel {
    shared: Arc<Shared>,
}

impl RingChannel {
    /// Create a channel holding up to `capacity - 1` bytes.
    ///
    /// Storage is not allocated until the first [`open`](Self::open).
    pub fn new(capacity: usize) -> Result<Self> {
        Self::named(DEFAULT_CHANNEL_NAME, capacity)
    }

    /// Create a named channel; the name appears in logs and status reports.
    pub fn named(name: impl Into<String>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ChannelError::InvalidArgument(
                "capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                name: name.into(),
                state: Mutex::new(State {
                    ring: Ring::new(capacity),
                    nreaders: 0,
                    nwriters: 0,
                }),
                inq: WaitQueue::new(),
                outq: WaitQueue::new(),
                events: WriteEvents::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn capacity(&self) -> usize {
        self.shared.state.lock().ring.capacity()
    }

    /// True when both handles refer to the same channel.
    pub fn same_channel(&self, other: &RingChannel) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Open a session, allocating storage if this is the first one.
    ///
    /// Fails only with [`ChannelError::OutOfMemory`], in which case the
    /// open counts are left untouched.
    pub fn open(&self, mode: AccessMode, non_blocking: bool) -> Result<OpenSession> {
        let mut state = self.shared.state.lock();

        if !state.ring.is_allocated() {
            state.ring.allocate()?;
            info!(
                device = %self.shared.name,
                capacity = state.ring.capacity(),
                "Buffer allocated"
            );
        }

        if mode.wants_read() {
            state.nreaders += 1;
        }
        if mode.wants_write() {
            state.nwriters += 1;
        }

        debug!(
            device = %self.shared.name,
            ?mode,
            non_blocking,
            readers = state.nreaders,
            writers = state.nwriters,
            "Session opened"
        );

        drop(state);
        Ok(OpenSession::new(self.clone(), mode, non_blocking))
    }

    /// Close a session.
    ///
    /// When the last reader and writer are gone the buffer is released and
    /// any unread bytes are discarded. A session from another channel is
    /// closed against its own channel.
    pub fn close(&self, mut session: OpenSession) {
        if !session.belongs_to(self) {
            warn!(
                device = %self.shared.name,
                "Closing a session that belongs to another channel"
            );
            return;
        }
        session.mark_closed();
        self.release(session.mode());
    }

    /// Read up to `buf.len()` bytes, sleeping while the buffer is empty.
    ///
    /// Returns at most one contiguous run: a read never crosses the end of
    /// storage, so draining a wrapped buffer can take two calls.
    pub fn read(&self, session: &OpenSession, buf: &mut [u8]) -> Result<usize> {
        self.read_inner(session, buf, session.is_non_blocking())
    }

    /// Read without sleeping, whatever the session's blocking mode.
    pub fn try_read(&self, session: &OpenSession, buf: &mut [u8]) -> Result<usize> {
        self.read_inner(session, buf, true)
    }

    /// Write up to `data.len()` bytes, sleeping while the buffer is full.
    ///
    /// Short writes are normal: a write stores at most one contiguous run
    /// of free space.
    pub fn write(&self, session: &OpenSession, data: &[u8]) -> Result<usize> {
        self.write_inner(session, data, session.is_non_blocking())
    }

    /// Write without sleeping, whatever the session's blocking mode.
    pub fn try_write(&self, session: &OpenSession, data: &[u8]) -> Result<usize> {
        self.write_inner(session, data, true)
    }

    /// Report readiness without sleeping.
    ///
    /// When `waker` is given it is registered on both wait queues before the
    /// state is sampled, so any later read or write wakes it.
    pub fn poll(&self, session: &OpenSession, waker: Option<&Waker>) -> Result<Readiness> {
        self.check_session(session)?;
        let state = self.shared.state.lock();

        if let Some(waker) = waker {
            self.shared.inq.register(waker);
            self.shared.outq.register(waker);
        }

        let mut readiness = Readiness::empty();
        if !state.ring.is_empty() {
            readiness |= Readiness::READABLE;
        }
        if state.ring.free_space() > 0 {
            readiness |= Readiness::WRITABLE;
        }
        Ok(readiness)
    }

    /// Subscribe to write-completed events.
    pub fn subscribe_writes(&self) -> broadcast::Receiver<WriteEvent> {
        self.shared.events.subscribe()
    }

    pub fn status(&self) -> ChannelStatus {
        let state = self.shared.state.lock();
        let (used, free) = if state.ring.is_allocated() {
            (state.ring.used_space(), state.ring.free_space())
        } else {
            (0, 0)
        };
        ChannelStatus {
            name: self.shared.name.clone(),
            capacity: state.ring.capacity(),
            allocated: state.ring.is_allocated(),
            read_pos: state.ring.read_pos(),
            write_pos: state.ring.write_pos(),
            used,
            free,
            readers: state.nreaders,
            writers: state.nwriters,
            readers_waiting: self.shared.inq.sleepers(),
            writers_waiting: self.shared.outq.sleepers(),
        }
    }

    /// Drop one session's counts; called exactly once per session.
    pub(crate) fn release(&self, mode: AccessMode) {
        let mut state = self.shared.state.lock();
        if mode.wants_read() {
            state.nreaders = state.nreaders.saturating_sub(1);
        }
        if mode.wants_write() {
            state.nwriters = state.nwriters.saturating_sub(1);
        }

        debug!(
            device = %self.shared.name,
            ?mode,
            readers = state.nreaders,
            writers = state.nwriters,
            "Session closed"
        );

        if state.nreaders + state.nwriters == 0 {
            let discarded = state.ring.used_space();
            state.ring.release();
            info!(device = %self.shared.name, discarded, "Buffer released");
        }
    }

    /// Wake every sleeper so sessions with a pending signal can bail out.
    ///
    /// Taking the lock orders this after any sleeper's signal check.
    pub(crate) fn deliver_signal(&self) {
        let _state = self.shared.state.lock();
        self.shared.inq.wake_all();
        self.shared.outq.wake_all();
    }

    fn check_session(&self, session: &OpenSession) -> Result<()> {
        if session.belongs_to(self) {
            Ok(())
        } else {
            Err(ChannelError::InvalidArgument(format!(
                "session belongs to channel '{}', not '{}'",
                session.channel().name(),
                self.shared.name
            )))
        }
    }

    fn read_inner(
        &self,
        session: &OpenSession,
        buf: &mut [u8],
        non_blocking: bool,
    ) -> Result<usize> {
        self.check_session(session)?;
        if !session.wants_read() {
            return Err(ChannelError::BadAccess);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.state.lock();
        while state.ring.is_empty() {
            if non_blocking {
                return Err(ChannelError::WouldBlock);
            }
            self.sleep(&self.shared.inq, session, &mut state, |s| {
                !s.ring.is_empty()
            })?;
        }

        let count = state.ring.copy_out(buf);
        drop(state);

        self.shared.outq.wake_one();
        debug!(device = %self.shared.name, count, "Read completed");
        Ok(count)
    }

    fn write_inner(
        &self,
        session: &OpenSession,
        data: &[u8],
        non_blocking: bool,
    ) -> Result<usize> {
        self.check_session(session)?;
        if !session.wants_write() {
            return Err(ChannelError::BadAccess);
        }
        if data.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.state.lock();
        while state.ring.free_space() == 0 {
            if non_blocking {
                return Err(ChannelError::WouldBlock);
            }
            self.sleep(&self.shared.outq, session, &mut state, |s| {
                s.ring.free_space() > 0
            })?;
        }

        let count = state.ring.copy_in(data);
        let available = state.ring.used_space();
        drop(state);

        self.shared.inq.wake_one();
        self.shared.events.publish(WriteEvent {
            written: count,
            available,
        });
        debug!(device = %self.shared.name, count, available, "Write completed");
        Ok(count)
    }

    /// Sleep once on `queue`, failing with `Interrupted` if a signal is
    /// pending before or after the sleep.
    ///
    /// An interrupted sleeper may have absorbed the wake-up meant for its
    /// queue; when `ready` holds it hands that wake-up to the next sleeper.
    fn sleep(
        &self,
        queue: &WaitQueue,
        session: &OpenSession,
        state: &mut MutexGuard<'_, State>,
        ready: impl Fn(&State) -> bool,
    ) -> Result<()> {
        if session.take_signal() {
            warn!(device = %self.shared.name, "Signal pending, not sleeping");
            return Err(ChannelError::Interrupted);
        }

        debug!(device = %self.shared.name, "Going to sleep");
        queue.wait(state);

        if session.take_signal() {
            if ready(&**state) {
                queue.wake_one();
            }
            warn!(device = %self.shared.name, "Sleep interrupted by signal");
            return Err(ChannelError::Interrupted);
        }

        debug!(device = %self.shared.name, "Awoken");
        Ok(())
    }
}

impl fmt::Debug for RingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingChannel")
            .field("name", &self.shared.name)
            .field("subscribers", &self.shared.events.subscriber_count())
            .finish_non_exhaustive()
    }
}
