//! RingChannel interface step definitions.

use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cucumber::{given, then, when, World};
use scullpipe::{AccessMode, ChannelError, OpenSession, Readiness, RingChannel};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Test context for RingChannel scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct RingChannelWorld {
    channel: Option<RingChannel>,
    sessions: HashMap<String, OpenSession>,
    last_result: Option<Result<usize, ChannelError>>,
    received: Vec<u8>,
    readiness: Option<Readiness>,
    saved_write_pos: Option<usize>,
    blocked_reader: Option<JoinHandle<Result<Vec<u8>, ChannelError>>>,
}

impl RingChannelWorld {
    fn new() -> Self {
        Self {
            channel: None,
            sessions: HashMap::new(),
            last_result: None,
            received: Vec::new(),
            readiness: None,
            saved_write_pos: None,
            blocked_reader: None,
        }
    }

    fn channel(&self) -> &RingChannel {
        self.channel.as_ref().expect("Channel not created")
    }

    fn session(&self, name: &str) -> &OpenSession {
        self.sessions
            .get(name)
            .unwrap_or_else(|| panic!("No session named {}", name))
    }

    fn open_pair(&mut self, non_blocking: bool) {
        let channel = self.channel().clone();
        let reader = channel
            .open(AccessMode::ReadOnly, non_blocking)
            .expect("Failed to open reader");
        let writer = channel
            .open(AccessMode::WriteOnly, non_blocking)
            .expect("Failed to open writer");
        self.sessions.insert("reader".to_string(), reader);
        self.sessions.insert("writer".to_string(), writer);
    }

    fn write(&mut self, data: &[u8]) {
        let result = self.channel().write(self.session("writer"), data);
        self.last_result = Some(result);
    }

    fn read(&mut self, len: usize) {
        let mut buf = vec![0u8; len];
        let result = self.channel().read(self.session("reader"), &mut buf);
        if let Ok(n) = result {
            self.received.extend_from_slice(&buf[..n]);
        }
        self.last_result = Some(result);
    }

    fn wait_for_sleepers(&self, readers: usize, writers: usize) {
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        loop {
            let status = self.channel().status();
            if status.readers_waiting == readers && status.writers_waiting == writers {
                return;
            }
            assert!(
                Instant::now() < deadline,
                "Timed out waiting for sleepers: {} readers, {} writers",
                status.readers_waiting,
                status.writers_waiting
            );
            thread::sleep(Duration::from_millis(1));
        }
    }
}

fn parse_error(name: &str) -> ChannelError {
    match name {
        "would block" => ChannelError::WouldBlock,
        "interrupted" => ChannelError::Interrupted,
        "bad access" => ChannelError::BadAccess,
        other => panic!("Unknown error name: {}", other),
    }
}

fn parse_readiness(name: &str) -> Readiness {
    match name {
        "nothing" => Readiness::empty(),
        "readable" => Readiness::READABLE,
        "writable" => Readiness::WRITABLE,
        "readable and writable" => Readiness::READABLE | Readiness::WRITABLE,
        other => panic!("Unknown readiness: {}", other),
    }
}

// --- Given steps ---

#[given(expr = "a channel with capacity {int}")]
async fn given_channel(world: &mut RingChannelWorld, capacity: usize) {
    world.channel = Some(RingChannel::new(capacity).expect("Failed to create channel"));
}

#[given("a non-blocking reader and writer")]
async fn given_non_blocking_pair(world: &mut RingChannelWorld) {
    world.open_pair(true);
}

#[given("a blocking reader and writer")]
async fn given_blocking_pair(world: &mut RingChannelWorld) {
    world.open_pair(false);
}

#[given(expr = "the writer has written {string}")]
async fn given_written(world: &mut RingChannelWorld, data: String) {
    world.write(data.as_bytes());
    assert_eq!(world.last_result, Some(Ok(data.len())));
}

#[given("the write position is recorded")]
async fn given_write_pos_recorded(world: &mut RingChannelWorld) {
    world.saved_write_pos = Some(world.channel().status().write_pos);
}

// --- When steps ---

#[when(expr = "the writer writes {string}")]
async fn when_write(world: &mut RingChannelWorld, data: String) {
    world.write(data.as_bytes());
}

#[when(expr = "the reader reads {int} bytes")]
async fn when_read(world: &mut RingChannelWorld, len: usize) {
    world.read(len);
}

#[when("the reader drains the channel")]
async fn when_drain(world: &mut RingChannelWorld) {
    let capacity = world.channel().capacity();
    loop {
        world.read(capacity);
        match world.last_result {
            Some(Ok(_)) => continue,
            Some(Err(ChannelError::WouldBlock)) => break,
            ref other => panic!("Unexpected result while draining: {:?}", other),
        }
    }
}

#[when("the reader tries to write")]
async fn when_reader_writes(world: &mut RingChannelWorld) {
    let result = world.channel().write(world.session("reader"), b"x");
    world.last_result = Some(result);
}

#[when("the channel is polled")]
async fn when_polled(world: &mut RingChannelWorld) {
    world.readiness = Some(
        world
            .channel()
            .poll(world.session("reader"), None)
            .expect("Poll failed"),
    );
}

#[when(expr = "a blocking reader waits for {int} bytes")]
async fn when_blocking_reader_waits(world: &mut RingChannelWorld, len: usize) {
    let channel = world.channel().clone();
    let session = channel
        .open(AccessMode::ReadOnly, false)
        .expect("Failed to open blocking reader");
    world.blocked_reader = Some(thread::spawn(move || {
        let mut buf = vec![0u8; len];
        let n = channel.read(&session, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }));
    world.wait_for_sleepers(1, 0);
}

#[when(expr = "a blocking writer trying to write {string} is interrupted")]
async fn when_blocking_writer_interrupted(world: &mut RingChannelWorld, data: String) {
    let channel = world.channel().clone();
    let session = channel
        .open(AccessMode::WriteOnly, false)
        .expect("Failed to open blocking writer");
    let interrupter = session.interrupter();

    let handle = thread::spawn(move || channel.write(&session, data.as_bytes()));
    world.wait_for_sleepers(0, 1);
    interrupter.interrupt();

    world.last_result = Some(handle.join().expect("Writer thread panicked"));
}

#[when("every session is closed")]
async fn when_all_closed(world: &mut RingChannelWorld) {
    let channel = world.channel().clone();
    for (_, session) in world.sessions.drain() {
        channel.close(session);
    }
}

#[when("a new non-blocking reader and writer open")]
async fn when_reopen(world: &mut RingChannelWorld) {
    world.open_pair(true);
}

// --- Then steps ---

#[then(expr = "the last operation returns {int}")]
async fn then_returns(world: &mut RingChannelWorld, expected: usize) {
    assert_eq!(world.last_result, Some(Ok(expected)));
}

#[then(expr = "the last operation fails with {string}")]
async fn then_fails_with(world: &mut RingChannelWorld, name: String) {
    assert_eq!(world.last_result, Some(Err(parse_error(&name))));
}

#[then(expr = "the received bytes are {string}")]
async fn then_received(world: &mut RingChannelWorld, expected: String) {
    assert_eq!(String::from_utf8_lossy(&world.received), expected);
}

#[then(expr = "the channel reports {string}")]
async fn then_reports(world: &mut RingChannelWorld, expected: String) {
    assert_eq!(world.readiness, Some(parse_readiness(&expected)));
}

#[then("polling again reports the same readiness")]
async fn then_poll_idempotent(world: &mut RingChannelWorld) {
    let again = world
        .channel()
        .poll(world.session("reader"), None)
        .expect("Poll failed");
    assert_eq!(world.readiness, Some(again));
}

#[then(expr = "the channel holds {int} bytes")]
async fn then_holds(world: &mut RingChannelWorld, expected: usize) {
    assert_eq!(world.channel().status().used, expected);
}

#[then("the write position is unchanged")]
async fn then_write_pos_unchanged(world: &mut RingChannelWorld) {
    assert_eq!(
        Some(world.channel().status().write_pos),
        world.saved_write_pos
    );
}

#[then(expr = "the blocked reader receives {string}")]
async fn then_blocked_reader_receives(world: &mut RingChannelWorld, expected: String) {
    let handle = world.blocked_reader.take().expect("No blocked reader");
    let bytes = handle
        .join()
        .expect("Reader thread panicked")
        .expect("Blocked read failed");
    assert_eq!(String::from_utf8_lossy(&bytes), expected);
}

#[then("the channel storage is released")]
async fn then_released(world: &mut RingChannelWorld) {
    assert!(!world.channel().status().allocated);
}
