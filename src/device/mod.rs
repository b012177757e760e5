//! Pipe device set.
//!
//! An explicitly owned table of ring channels, one per minor number, built
//! from [`PipeConfig`]. Opening a minor returns a [`DeviceHandle`] that
//! forwards read/write/poll to its channel and closes its session on drop,
//! the way `release` runs when the last file reference goes away.

use std::fmt::Write as _;
use std::task::Waker;

use tracing::info;

use crate::channel::{ChannelStatus, RingChannel};
use crate::config::PipeConfig;
use crate::error::{ChannelError, Result};
use crate::readiness::Readiness;
use crate::session::{AccessMode, Interrupter, OpenSession};

/// Base name for devices; minor `n` is `scullpipe{n}`.
pub const DEVICE_NAME_PREFIX: &str = "scullpipe";

/// A fixed set of pipe devices.
#[derive(Debug)]
pub struct PipeDeviceSet {
    buffer_size: usize,
    channels: Vec<RingChannel>,
}

impl PipeDeviceSet {
    /// Build `config.devices` channels of `config.buffer_size` bytes each.
    pub fn new(config: &PipeConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ChannelError::InvalidArgument(e.to_string()))?;

        let channels = (0..config.devices)
            .map(|minor| {
                let name = format!("{}{}", DEVICE_NAME_PREFIX, minor);
                RingChannel::named(name, config.buffer_size)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            devices = config.devices,
            buffer_size = config.buffer_size,
            "Pipe devices registered"
        );

        Ok(Self {
            buffer_size: config.buffer_size,
            channels,
        })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Channel behind a minor number.
    pub fn channel(&self, minor: usize) -> Result<&RingChannel> {
        self.channels
            .get(minor)
            .ok_or(ChannelError::NoSuchDevice(minor))
    }

    /// Open a device by minor number.
    pub fn open(
        &self,
        minor: usize,
        mode: AccessMode,
        non_blocking: bool,
    ) -> Result<DeviceHandle> {
        let channel = self.channel(minor)?;
        let session = channel.open(mode, non_blocking)?;
        Ok(DeviceHandle { minor, session })
    }

    /// Open using `open(2)` style flags (`O_RDONLY`/`O_WRONLY`/`O_RDWR`,
    /// optionally `O_NONBLOCK`).
    pub fn open_with_flags(&self, minor: usize, flags: i32) -> Result<DeviceHandle> {
        let mode = AccessMode::from_open_flags(flags).ok_or_else(|| {
            ChannelError::InvalidArgument(format!("bad access mode in flags {:#o}", flags))
        })?;
        self.open(minor, mode, flags & libc::O_NONBLOCK != 0)
    }

    /// Status of every device, in minor order.
    pub fn status(&self) -> Vec<ChannelStatus> {
        self.channels.iter().map(RingChannel::status).collect()
    }

    /// Text report in the style of the driver's /proc entry.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Default buffersize is {}", self.buffer_size);
        for (minor, status) in self.status().iter().enumerate() {
            let _ = write!(out, "\nDevice {} {}", minor, status);
        }
        out
    }
}

/// An open device file: a minor number plus its channel session.
#[derive(Debug)]
pub struct DeviceHandle {
    minor: usize,
    session: OpenSession,
}

impl DeviceHandle {
    pub fn minor(&self) -> usize {
        self.minor
    }

    pub fn session(&self) -> &OpenSession {
        &self.session
    }

    pub fn set_non_blocking(&mut self, non_blocking: bool) {
        self.session.set_non_blocking(non_blocking);
    }

    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.session.channel().read(&self.session, buf)
    }

    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.session.channel().write(&self.session, data)
    }

    pub fn poll(&self, waker: Option<&Waker>) -> Result<Readiness> {
        self.session.channel().poll(&self.session, waker)
    }

    pub fn interrupter(&self) -> Interrupter {
        self.session.interrupter()
    }

    /// Explicit release; dropping the handle does the same.
    pub fn close(self) {
        let channel = self.session.channel().clone();
        channel.close(self.session);
    }
}
