//! Steady-state relay between the inbound endpoint and the destination
//!
//! Pumps bytes in both directions until one side closes, then tears both
//! sides down.

use crate::error::SessionError;
use crate::helper::DEFAULT_BUFFER_SIZE;
use crate::transport::{InboundSink, InboundStream};
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::debug;

/// Upper bound on tearing down either side of a session
pub(crate) const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A session whose destination has been resolved and dialed
///
/// Only built once the outbound socket exists, so every field is populated.
pub struct RelaySession<Tx, Rx, S> {
    inbound_tx: Tx,
    inbound_rx: Rx,
    outbound: S,
    idle_timeout: Option<Duration>,
}

impl<Tx, Rx, S> RelaySession<Tx, Rx, S>
where
    Tx: InboundSink,
    Rx: InboundStream,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a relay session
    pub fn new(inbound_tx: Tx, inbound_rx: Rx, outbound: S, idle_timeout: Option<Duration>) -> Self {
        RelaySession {
            inbound_tx,
            inbound_rx,
            outbound,
            idle_timeout,
        }
    }

    /// Run the session to completion
    ///
    /// Sends `response` to the client, writes `initial_payload` to the
    /// destination, then relays both directions. When either direction ends
    /// (or the session stays idle past the timeout) the destination is shut
    /// down and the inbound endpoint closed.
    pub async fn run(self, response: [u8; 2], initial_payload: &[u8]) -> Result<(), SessionError> {
        let RelaySession {
            mut inbound_tx,
            mut inbound_rx,
            outbound,
            idle_timeout,
        } = self;

        let (mut out_read, mut out_write) = tokio::io::split(outbound);
        let activity = Activity::new();

        let relay = async {
            inbound_tx.send(Bytes::copy_from_slice(&response)).await?;
            if !initial_payload.is_empty() {
                out_write.write_all(initial_payload).await?;
            }

            tokio::select! {
                result = pump_upstream(&mut inbound_rx, &mut out_write, &activity) => {
                    let bytes = result?;
                    debug!("Inbound closed after {} bytes upstream", bytes);
                }
                result = pump_downstream(&mut out_read, &mut inbound_tx, &activity) => {
                    let bytes = result?;
                    debug!("Destination closed after {} bytes downstream", bytes);
                }
            }

            Ok::<_, SessionError>(())
        };

        // The idle clock also covers the acknowledgement and the initial write
        let result = tokio::select! {
            result = relay => result,
            _ = activity.idle(idle_timeout) => {
                debug!("Session idle for {:?}, closing", idle_timeout.unwrap_or_default());
                Ok(())
            }
        };

        let _ = tokio::time::timeout(CLOSE_TIMEOUT, out_write.shutdown()).await;
        drop(out_write);
        drop(out_read);
        close_inbound(inbound_tx).await;

        result
    }
}

/// Close the inbound endpoint, giving up after [`CLOSE_TIMEOUT`]
///
/// A client that stopped reading can keep the close handshake pending
/// forever; the endpoint is dropped either way.
pub(crate) async fn close_inbound<Tx: InboundSink>(mut inbound_tx: Tx) {
    if tokio::time::timeout(CLOSE_TIMEOUT, inbound_tx.close())
        .await
        .is_err()
    {
        debug!("Inbound close timed out, dropping endpoint");
    }
}

/// Forward inbound messages to the destination
///
/// While a write is blocked one further inbound message is read ahead, so a
/// close of the inbound endpoint is noticed even when the destination has
/// stopped reading.
async fn pump_upstream<Rx, W>(
    inbound_rx: &mut Rx,
    writer: &mut W,
    activity: &Activity,
) -> Result<u64, SessionError>
where
    Rx: InboundStream,
    W: AsyncWrite + Unpin,
{
    let mut total = 0u64;
    let mut read_ahead: Option<Bytes> = None;

    loop {
        let chunk = match read_ahead.take() {
            Some(chunk) => chunk,
            None => match inbound_rx.next().await {
                Some(chunk) => chunk?,
                None => return Ok(total),
            },
        };
        activity.touch();

        let write = writer.write_all(&chunk);
        tokio::pin!(write);
        loop {
            tokio::select! {
                result = &mut write => {
                    result?;
                    break;
                }
                item = inbound_rx.next(), if read_ahead.is_none() => {
                    match item {
                        Some(next) => read_ahead = Some(next?),
                        None => return Ok(total),
                    }
                }
            }
        }

        total += chunk.len() as u64;
    }
}

/// Forward destination bytes to the inbound endpoint, one message per read
async fn pump_downstream<R, Tx>(
    reader: &mut R,
    inbound_tx: &mut Tx,
    activity: &Activity,
) -> Result<u64, SessionError>
where
    R: AsyncRead + Unpin,
    Tx: InboundSink,
{
    let mut total = 0u64;
    let mut buf = BytesMut::with_capacity(DEFAULT_BUFFER_SIZE);

    loop {
        buf.reserve(DEFAULT_BUFFER_SIZE);
        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        activity.touch();

        inbound_tx.send(buf.split().freeze()).await?;
        total += n as u64;
    }
}

/// Last-traffic clock shared by both directions of a session
struct Activity {
    start: Instant,
    last_millis: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Activity {
            start: Instant::now(),
            last_millis: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        self.last_millis
            .store(self.start.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn last(&self) -> Instant {
        self.start + Duration::from_millis(self.last_millis.load(Ordering::Relaxed))
    }

    /// Resolves once no traffic was seen for `timeout`; never with `None`
    async fn idle(&self, timeout: Option<Duration>) {
        let Some(timeout) = timeout else {
            return futures::future::pending().await;
        };

        loop {
            let deadline = self.last() + timeout;
            tokio::time::sleep_until(deadline).await;
            if Instant::now() >= self.last() + timeout {
                return;
            }
        }
    }
}
