//! Async adapters over [`RingChannel::poll`].
//!
//! These let an executor multiplex channels the way select/poll multiplex
//! device files: the task registers its waker through `poll`, and the next
//! read or write on the channel wakes it. Nothing here parks an executor
//! thread; reads and writes go through the non-blocking entry points.

use std::task::Poll;

use futures::future::poll_fn;

use crate::channel::RingChannel;
use crate::error::{ChannelError, Result};
use crate::readiness::Readiness;
use crate::session::OpenSession;

/// Resolve once any direction in `interest` is ready.
pub async fn ready(
    channel: &RingChannel,
    session: &OpenSession,
    interest: Readiness,
) -> Result<Readiness> {
    poll_fn(|cx| match channel.poll(session, Some(cx.waker())) {
        Ok(readiness) if readiness.intersects(interest) => Poll::Ready(Ok(readiness)),
        Ok(_) => Poll::Pending,
        Err(e) => Poll::Ready(Err(e)),
    })
    .await
}

/// Resolve once the channel holds data.
pub async fn readable(channel: &RingChannel, session: &OpenSession) -> Result<Readiness> {
    ready(channel, session, Readiness::READABLE).await
}

/// Resolve once the channel has free space.
pub async fn writable(channel: &RingChannel, session: &OpenSession) -> Result<Readiness> {
    ready(channel, session, Readiness::WRITABLE).await
}

/// Read without blocking the executor.
pub async fn read(channel: &RingChannel, session: &OpenSession, buf: &mut [u8]) -> Result<usize> {
    loop {
        match channel.try_read(session, buf) {
            Err(ChannelError::WouldBlock) => {
                readable(channel, session).await?;
            }
            other => return other,
        }
    }
}

/// Write without blocking the executor.
pub async fn write(channel: &RingChannel, session: &OpenSession, data: &[u8]) -> Result<usize> {
    loop {
        match channel.try_write(session, data) {
            Err(ChannelError::WouldBlock) => {
                writable(channel, session).await?;
            }
            other => return other,
        }
    }
}

/// Write all of `data`, awaiting space as needed.
pub async fn write_all(channel: &RingChannel, session: &OpenSession, data: &[u8]) -> Result<()> {
    let mut sent = 0;
    while sent < data.len() {
        sent += write(channel, session, &data[sent..]).await?;
    }
    Ok(())
}

/// Wait on several channels at once.
///
/// Resolves with the index of the first pair whose readiness intersects
/// `interest`, and that readiness. An empty list never resolves.
pub async fn wait_any(
    pairs: &[(&RingChannel, &OpenSession)],
    interest: Readiness,
) -> Result<(usize, Readiness)> {
    poll_fn(|cx| {
        for (index, (channel, session)) in pairs.iter().enumerate() {
            match channel.poll(session, Some(cx.waker())) {
                Ok(readiness) if readiness.intersects(interest) => {
                    return Poll::Ready(Ok((index, readiness)));
                }
                Ok(_) => {}
                Err(e) => return Poll::Ready(Err(e)),
            }
        }
        Poll::Pending
    })
    .await
}
