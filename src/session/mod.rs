//! Session module for Wsrelay
//!
//! A session starts with the first inbound frame: the tunnel header is
//! decoded, the destination is dialed (directly or through the SOCKS5 relay)
//! and the session then becomes a [`RelaySession`] pumping bytes both ways.

mod relay;

pub use relay::RelaySession;

pub(crate) use relay::close_inbound;

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::helper::{timeout_from_secs, DNS_PORT};
use crate::protocol::{decode, Command, DecodedHeader, DestinationDescriptor, IDENTIFIER_LEN};
use crate::socks::Socks5Client;
use crate::transport::{Dialer, InboundSink, InboundStream};
use anyhow::anyhow;
use bytes::Bytes;
use futures::StreamExt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Handles proxied sessions for one configured identifier
///
/// Holds only immutable configuration, so one value is shared by every
/// session the server spawns.
pub struct SessionRelay<D: Dialer> {
    identifier: [u8; IDENTIFIER_LEN],
    dialer: Arc<D>,
    relay: Option<Socks5Client>,
    dns_redirect: SocketAddr,
    idle_timeout: Option<Duration>,
}

impl<D: Dialer> SessionRelay<D> {
    /// Create a session relay dialing destinations directly
    pub fn new(identifier: [u8; IDENTIFIER_LEN], dialer: Arc<D>) -> Self {
        SessionRelay {
            identifier,
            dialer,
            relay: None,
            dns_redirect: SocketAddr::from(([8, 8, 8, 8], DNS_PORT)),
            idle_timeout: None,
        }
    }

    /// Route destinations through a SOCKS5 relay
    pub fn with_relay(mut self, relay: Socks5Client) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Set the target of UDP/53 sessions
    pub fn with_dns_redirect(mut self, target: SocketAddr) -> Self {
        self.dns_redirect = target;
        self
    }

    /// Close sessions that carry no traffic for `timeout`
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Create a session relay from server configuration
    pub fn from_config(config: &ServerConfig, dialer: Arc<D>) -> anyhow::Result<Self> {
        let identifier = config.identifier().map_err(|e| anyhow!(e))?;
        let mut relay = SessionRelay::new(identifier, dialer)
            .with_dns_redirect(config.dns_redirect)
            .with_idle_timeout(timeout_from_secs(config.idle_timeout));

        if let Some(client) = Socks5Client::from_config(&config.socks).map_err(|e| anyhow!(e))? {
            info!("Relaying destinations through SOCKS5 {}", client.relay_addr());
            relay = relay.with_relay(client);
        }

        Ok(relay)
    }

    /// Idle timeout, which also bounds each setup phase of a session
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Whether destinations go through the SOCKS5 relay
    pub fn is_relayed(&self) -> bool {
        self.relay.is_some()
    }

    /// Run one session to completion
    ///
    /// The first frame is `early_data` when present, otherwise the first
    /// inbound message. Any failure before the relay starts closes the
    /// inbound endpoint without sending a response.
    pub async fn run<Tx, Rx>(
        &self,
        inbound_tx: Tx,
        mut inbound_rx: Rx,
        early_data: Option<Bytes>,
    ) -> Result<(), SessionError>
    where
        Tx: InboundSink,
        Rx: InboundStream,
    {
        let established = within_setup_timeout(
            self.idle_timeout,
            self.establish(&mut inbound_rx, early_data),
        )
        .await;
        let (first_frame, header, outbound) = match established {
            Ok(established) => established,
            Err(e) => {
                close_inbound(inbound_tx).await;
                return Err(e);
            }
        };

        RelaySession::new(inbound_tx, inbound_rx, outbound, self.idle_timeout)
            .run(header.response(), &first_frame[header.payload_offset..])
            .await
    }

    /// Read and decode the first frame, then dial its destination
    async fn establish<Rx: InboundStream>(
        &self,
        inbound_rx: &mut Rx,
        early_data: Option<Bytes>,
    ) -> Result<(Bytes, DecodedHeader, D::Stream), SessionError> {
        let first_frame = match early_data {
            Some(data) => {
                debug!("Using {} bytes of early data as first frame", data.len());
                data
            }
            None => match inbound_rx.next().await {
                Some(frame) => frame?,
                None => return Err(SessionError::InboundClosed),
            },
        };

        let header = decode(&first_frame, &self.identifier)?;
        let destination = self.resolve_destination(&header.destination)?;
        debug!("Session request for {}", header.destination);

        let outbound = self.dial(&destination).await?;
        Ok((first_frame, header, outbound))
    }

    /// Pick the address actually dialed for a requested destination
    ///
    /// TCP destinations pass through. UDP is only relayed for DNS and always
    /// goes to the configured redirect target.
    pub fn resolve_destination(
        &self,
        requested: &DestinationDescriptor,
    ) -> Result<DestinationDescriptor, SessionError> {
        match requested.command {
            Command::Tcp => Ok(requested.clone()),
            Command::Udp if requested.port == DNS_PORT => Ok(
                DestinationDescriptor::from_socket_addr(self.dns_redirect, Command::Udp),
            ),
            Command::Udp => Err(SessionError::UdpPortRejected(requested.port)),
        }
    }

    async fn dial(&self, destination: &DestinationDescriptor) -> Result<D::Stream, SessionError> {
        match &self.relay {
            Some(relay) => {
                let stream = relay
                    .connect(self.dialer.as_ref(), destination, || {
                        info!(
                            "Connected to {} via SOCKS5 relay {}",
                            destination,
                            relay.relay_addr()
                        )
                    })
                    .await?;
                Ok(stream)
            }
            None => {
                let stream = self
                    .dialer
                    .dial(&destination.host, destination.port)
                    .await
                    .map_err(|source| SessionError::DestinationUnreachable {
                        target: destination.target(),
                        source,
                    })?;
                info!("Connected to {}", destination);
                Ok(stream)
            }
        }
    }
}

/// Run a setup phase, failing with `SetupTimeout` once `timeout` elapses
pub(crate) async fn within_setup_timeout<T, F>(
    timeout: Option<Duration>,
    setup: F,
) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, setup)
            .await
            .map_err(|_| SessionError::SetupTimeout(limit))?,
        None => setup.await,
    }
}
