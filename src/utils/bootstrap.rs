//! Bootstrap utilities for scullpipe binaries.

use std::thread;
use std::time::Duration;

use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;
use crate::error::{ChannelError, Result};

/// Initialize tracing with SCULLPIPE_LOG environment variable.
///
/// Defaults to "info" level if SCULLPIPE_LOG is not set. Output goes to
/// stderr so it never mixes with data copied to stdout.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run a non-blocking operation until it stops returning `WouldBlock`.
///
/// Sleeps `delay` between attempts, the way a user-space program polls a
/// descriptor opened with `O_NONBLOCK`. `Interrupted` is retried at once;
/// any other error is returned.
///
/// # Arguments
/// * `label` - Human-readable name for logging (e.g., "read", "write")
/// * `delay` - Pause between `WouldBlock` attempts
/// * `op` - The operation to attempt
pub fn retry_would_block<T, F>(label: &str, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match op() {
            Err(ChannelError::WouldBlock) => {
                debug!(label, attempt, ?delay, "Would block, retrying");
                thread::sleep(delay);
            }
            Err(e) if e.is_restartable() => {
                debug!(label, attempt, "Interrupted, restarting");
            }
            other => return other,
        }
    }
}
