//! Test helpers shared by the unit test modules.

use std::thread;
use std::time::{Duration, Instant};

use crate::channel::RingChannel;
use crate::session::{AccessMode, OpenSession};

/// How long helpers wait for other threads before failing the test.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Open one read-only and one write-only session.
pub fn open_pair(channel: &RingChannel, non_blocking: bool) -> (OpenSession, OpenSession) {
    let reader = channel
        .open(AccessMode::ReadOnly, non_blocking)
        .expect("open reader");
    let writer = channel
        .open(AccessMode::WriteOnly, non_blocking)
        .expect("open writer");
    (reader, writer)
}

/// Block until exactly `readers` and `writers` threads sleep on the channel.
pub fn wait_for_sleepers(channel: &RingChannel, readers: usize, writers: usize) {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        let status = channel.status();
        if status.readers_waiting == readers && status.writers_waiting == writers {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "Timed out waiting for {} readers / {} writers asleep, have {} / {}",
            readers,
            writers,
            status.readers_waiting,
            status.writers_waiting
        );
        thread::sleep(Duration::from_millis(1));
    }
}
