//! Interface tests for ring channels and pipe devices using Cucumber.
//!
//! These tests describe the observable contract of a channel (blocking,
//! non-blocking, wraparound, interruption, last-close discard) and of the
//! device set built on top of it.
//!
//! ```bash
//! cargo test --test interfaces
//! ```


use cucumber::World;
use steps::device_set::DeviceSetWorld;
use steps::ring_channel::RingChannelWorld;

#[tokio::main]
async fn main() {
    // Run RingChannel tests
    println!("\n=== Running RingChannel Interface Tests ===\n");
    RingChannelWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/interfaces/features/ring_channel.feature")
        .await;

    // Run DeviceSet tests
    println!("\n=== Running DeviceSet Interface Tests ===\n");
    DeviceSetWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/interfaces/features/device_set.feature")
        .await;
}
