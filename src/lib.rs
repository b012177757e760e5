//! Scullpipe - bounded byte channels with pipe semantics
//!
//! A fixed-capacity ring buffer shared by readers and writers. Reads block
//! while empty, writes block while full, non-blocking sessions get
//! `WouldBlock` instead, and sleeping callers can be interrupted. Modeled on
//! the scullpipe character device.

pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod io;
pub mod notify;
pub mod readiness;
pub mod session;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use channel::{ChannelStatus, RingChannel};
pub use config::PipeConfig;
pub use device::{DeviceHandle, PipeDeviceSet};
pub use error::{ChannelError, Result};
pub use notify::WriteEvent;
pub use readiness::Readiness;
pub use session::{AccessMode, Interrupter, OpenSession};
