//! Error taxonomy for ring channel operations.
//!
//! `WouldBlock` and `Interrupted` never merge: the dispatch layer retries
//! the call on `Interrupted` and reports "try again" on `WouldBlock`.

use std::io;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors that can occur during channel operations.
///
/// No variant is fatal to the channel: a failed call leaves positions,
/// storage and open counts exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// A non-blocking session asked for an operation that would have slept.
    #[error("Operation would block")]
    WouldBlock,

    /// A sleeping operation was cancelled by a signal before its condition held.
    #[error("Interrupted while waiting")]
    Interrupted,

    /// Buffer storage could not be allocated on open.
    #[error("Out of memory allocating {requested} byte buffer")]
    OutOfMemory { requested: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The session was not opened for the requested direction.
    #[error("Session not opened for this access")]
    BadAccess,

    #[error("No such device: minor {0}")]
    NoSuchDevice(usize),
}

impl ChannelError {
    /// Errno value the dispatch layer hands back to its caller.
    ///
    /// `Interrupted` maps to `EINTR`; the restart decision is the caller's,
    /// see [`ChannelError::is_restartable`].
    pub fn errno(&self) -> i32 {
        match self {
            ChannelError::WouldBlock => libc::EAGAIN,
            ChannelError::Interrupted => libc::EINTR,
            ChannelError::OutOfMemory { .. } => libc::ENOMEM,
            ChannelError::InvalidArgument(_) => libc::EINVAL,
            ChannelError::BadAccess => libc::EBADF,
            ChannelError::NoSuchDevice(_) => libc::ENODEV,
        }
    }

    /// True when the failed call may simply be issued again.
    pub fn is_restartable(&self) -> bool {
        matches!(self, ChannelError::Interrupted)
    }
}

impl From<ChannelError> for io::Error {
    fn from(err: ChannelError) -> Self {
        let kind = match err {
            ChannelError::WouldBlock => io::ErrorKind::WouldBlock,
            ChannelError::Interrupted => io::ErrorKind::Interrupted,
            ChannelError::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
            ChannelError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            ChannelError::BadAccess => io::ErrorKind::PermissionDenied,
            ChannelError::NoSuchDevice(_) => io::ErrorKind::NotFound,
        };
        io::Error::new(kind, err)
    }
}
