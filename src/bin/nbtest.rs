//! nbtest: non-blocking copy through a pipe device
//!
//! Copies stdin to stdout through device 0 of a [`PipeDeviceSet`], with
//! both ends opened `O_NONBLOCK`. Every `WouldBlock` is retried after the
//! delay given on the command line, in milliseconds (default 1000). Exits
//! once stdin hits EOF and the device has been drained.
//!
//! ```text
//! stdin --(feeder thread)--> scullpipe0 --(main loop)--> stdout
//! ```
//!
//! ## Configuration
//! - SCULLPIPE_CONFIG / scullpipe.yaml: device count and buffer size
//! - SCULLPIPE_LOG: tracing filter (default: info)

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use scullpipe::utils::bootstrap::{init_tracing, retry_would_block};
use scullpipe::{ChannelError, PipeConfig, PipeDeviceSet};

const DEFAULT_DELAY_MS: u64 = 1000;
const CHUNK_SIZE: usize = 4096;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    init_tracing();

    let delay_ms = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>()?,
        None => DEFAULT_DELAY_MS,
    };
    let delay = Duration::from_millis(delay_ms);

    let config = PipeConfig::load(None)?;
    let devices = PipeDeviceSet::new(&config)?;
    let reader = devices.open_with_flags(0, libc::O_RDONLY | libc::O_NONBLOCK)?;
    let writer = devices.open_with_flags(0, libc::O_WRONLY | libc::O_NONBLOCK)?;

    info!(delay_ms, buffer_size = config.buffer_size, "nbtest started");

    let feeder = thread::spawn(move || -> Result<u64, BoxError> {
        let mut stdin = std::io::stdin().lock();
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = stdin.read(&mut chunk)?;
            if n == 0 {
                return Ok(total);
            }
            let mut sent = 0;
            while sent < n {
                let written =
                    retry_would_block("write", delay, || writer.write(&chunk[sent..n]))?;
                sent += written;
            }
            total += n as u64;
        }
    });

    let mut stdout = std::io::stdout().lock();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        // Sampled before the read so a final write cannot slip in between.
        let fed = feeder.is_finished();
        match reader.read(&mut buf) {
            Ok(n) => {
                stdout.write_all(&buf[..n])?;
                stdout.flush()?;
            }
            Err(ChannelError::WouldBlock) if fed => break,
            Err(ChannelError::WouldBlock) => thread::sleep(delay),
            Err(e) => {
                error!(error = %e, "Read from device failed");
                return Err(e.into());
            }
        }
    }

    let copied = feeder
        .join()
        .map_err(|_| BoxError::from("feeder thread panicked"))??;
    info!(bytes = copied, "nbtest finished");
    Ok(())
}
