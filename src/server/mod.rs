//! Server module for Wsrelay
//!
//! Accepts TCP connections, upgrades them to WebSocket and runs one tunnel
//! session per connection in its own task.

use crate::config::ServerConfig;
use crate::error::{HeaderError, SessionError};
use crate::session::{within_setup_timeout, SessionRelay};
use crate::transport::ws::{accept, decode_early_data, split_endpoint};
use crate::transport::{Dialer, SocketOpts, TcpDialer};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn, Instrument};

/// WebSocket tunnel server
pub struct Server {
    listener: TcpListener,
    relay: Arc<SessionRelay<TcpDialer>>,
    socket_opts: SocketOpts,
    early_data: bool,
}

impl Server {
    /// Bind the listener described by `config`
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let socket_opts = SocketOpts::from_tcp_config(&config.tcp);
        let dialer = Arc::new(TcpDialer::new(socket_opts.clone()));
        let relay = SessionRelay::from_config(config, dialer)?;

        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

        Ok(Server {
            listener,
            relay: Arc::new(relay),
            socket_opts,
            early_data: config.early_data,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until shutdown
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        info!("Listening on {}", self.local_addr()?);
        if self.relay.is_relayed() {
            info!("Destinations are dialed through the SOCKS5 relay");
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            continue;
                        }
                    };

                    if let Err(e) = self.socket_opts.apply(&stream) {
                        warn!("Failed to apply socket options: {}", e);
                    }

                    let relay = self.relay.clone();
                    let early_data = self.early_data;
                    tokio::spawn(
                        async move {
                            match serve_connection(stream, &relay, early_data).await {
                                Ok(()) => debug!("Session closed"),
                                Err(e) => log_session_error(&e),
                            }
                        }
                        .instrument(info_span!("session", %peer)),
                    );
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Run one tunnel session on an accepted connection
///
/// Performs the WebSocket handshake, takes the first frame from the
/// `Sec-WebSocket-Protocol` header when `early_data` is set, and hands the
/// endpoint to `relay`. The handshake is bounded by the relay's idle timeout.
pub async fn serve_connection<S, D>(
    stream: S,
    relay: &SessionRelay<D>,
    early_data: bool,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    D: Dialer,
{
    let (ws, protocol) = within_setup_timeout(relay.idle_timeout(), async {
        accept(stream).await.map_err(SessionError::from)
    })
    .await?;
    debug!("WebSocket handshake completed");

    let first_frame = match protocol {
        Some(value) if early_data => decode_early_data(&value).map_err(|e| {
            debug!("Invalid early data: {}", e);
            HeaderError::MalformedHeader
        })?,
        _ => None,
    };

    let (inbound_tx, inbound_rx) = split_endpoint(ws);
    relay.run(inbound_tx, inbound_rx, first_frame).await
}

/// Protocol failures are warnings, ordinary disconnects are not
fn log_session_error(error: &SessionError) {
    match error {
        SessionError::Io(_) | SessionError::InboundClosed | SessionError::SetupTimeout(_) => {
            debug!("Session ended: {}", error)
        }
        _ => warn!("Session failed: {}", error),
    }
}
