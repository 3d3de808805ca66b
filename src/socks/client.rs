//! SOCKS5 relay client
//!
//! Drives a SOCKS5 handshake against an upstream relay and hands back the
//! connection once CONNECT succeeds. From then on the stream is transparent:
//! every byte written goes to the destination.

use super::consts::*;
use super::types::{socks_addr_type, Credentials, Socks5State};
use crate::config::SocksRelayConfig;
use crate::error::Socks5Error;
use crate::protocol::DestinationDescriptor;
use crate::transport::Dialer;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Client for an upstream SOCKS5 relay
///
/// One handshake is attempted per call to [`Socks5Client::connect`]; there
/// is no retry.
#[derive(Debug, Clone)]
pub struct Socks5Client {
    /// Relay host
    host: String,
    /// Relay port
    port: u16,
    /// Credentials offered when the relay asks for username/password
    credentials: Option<Credentials>,
    /// Deadline for the transport connect to the relay
    connect_timeout: Duration,
}

impl Socks5Client {
    /// Create a client for the relay at `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Socks5Client {
            host: host.into(),
            port,
            credentials: None,
            connect_timeout: Duration::from_secs(SOCKS5_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Set credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the relay connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create a client from configuration
    ///
    /// Returns `None` when relaying is disabled.
    pub fn from_config(config: &SocksRelayConfig) -> Result<Option<Self>, String> {
        if !config.relay {
            return Ok(None);
        }
        config.validate()?;

        let host = config
            .host
            .clone()
            .ok_or_else(|| "SOCKS5 relay host not defined".to_string())?;
        let port = config
            .port
            .ok_or_else(|| "SOCKS5 relay port not defined".to_string())?;

        let mut client = Socks5Client::new(host, port)
            .with_connect_timeout(Duration::from_secs(config.connect_timeout));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            client = client.with_credentials(Credentials::new(username, password));
        }

        Ok(Some(client))
    }

    /// Relay address as `host:port`
    pub fn relay_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open a connection to `destination` through the relay
    ///
    /// `on_connect` runs once the relay reports CONNECT success, before the
    /// stream is returned.
    pub async fn connect<D, F>(
        &self,
        dialer: &D,
        destination: &DestinationDescriptor,
        on_connect: F,
    ) -> Result<D::Stream, Socks5Error>
    where
        D: Dialer,
        F: FnOnce(),
    {
        let stream = match tokio::time::timeout(
            self.connect_timeout,
            dialer.dial(&self.host, self.port),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(Socks5Error::RelayUnreachable(format!(
                    "{}: {}",
                    self.relay_addr(),
                    e
                )))
            }
            Err(_) => {
                return Err(Socks5Error::RelayUnreachable(format!(
                    "{}: connect timed out after {:?}",
                    self.relay_addr(),
                    self.connect_timeout
                )))
            }
        };

        debug!("Connected to SOCKS5 relay {}", self.relay_addr());

        let mut session = Socks5Session::new(stream);
        session.negotiate(self.credentials.as_ref()).await?;
        let stream = session.connect(destination).await?;

        on_connect();
        Ok(stream)
    }
}

/// One SOCKS5 handshake on an already connected stream
#[derive(Debug)]
pub struct Socks5Session<S> {
    stream: S,
    state: Socks5State,
}

impl<S> Socks5Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a freshly connected relay stream
    pub fn new(stream: S) -> Self {
        Socks5Session {
            stream,
            state: Socks5State::Connecting,
        }
    }

    /// Current handshake state
    pub fn state(&self) -> Socks5State {
        self.state
    }

    /// Send the greeting and authenticate if the relay asks for it
    ///
    /// # Method Selection
    ///
    /// ```text
    /// +----+----------+----------+      +----+--------+
    /// |VER | NMETHODS | METHODS  |  ->  |VER | METHOD |
    /// +----+----------+----------+      +----+--------+
    /// | 1  |    1     | 1 to 255 |      | 1  |   1    |
    /// +----+----------+----------+      +----+--------+
    /// ```
    pub async fn negotiate(&mut self, credentials: Option<&Credentials>) -> Result<(), Socks5Error> {
        let result = self.run_negotiation(credentials).await;
        self.settle(result).await
    }

    /// Issue CONNECT and return the stream on success
    ///
    /// # CONNECT Request and Reply
    ///
    /// ```text
    /// +----+-----+-------+------+----------+----------+
    /// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
    /// +----+-----+-------+------+----------+----------+
    /// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
    /// +----+-----+-------+------+----------+----------+
    /// | 1  |  1  | X'00' |  1   | Variable |    2     |
    /// +----+-----+-------+------+----------+----------+
    /// ```
    pub async fn connect(mut self, destination: &DestinationDescriptor) -> Result<S, Socks5Error> {
        if self.state != Socks5State::Ready {
            return Err(Socks5Error::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("CONNECT issued in state {}", self.state),
            )));
        }

        let result = self.run_connect(destination).await;
        self.settle(result).await?;
        Ok(self.stream)
    }

    async fn run_negotiation(&mut self, credentials: Option<&Credentials>) -> Result<(), Socks5Error> {
        self.stream.write_all(&SOCKS5_GREETING).await?;
        self.stream.flush().await?;
        self.state = Socks5State::AwaitingMethodChoice;

        let mut reply = [0u8; 2];
        self.stream.read_exact(&mut reply).await?;
        expect_version(SOCKS5_VERSION, reply[0])?;

        match reply[1] {
            SOCKS5_AUTH_METHOD_NONE => {
                trace!("Relay selected no authentication");
            }
            SOCKS5_AUTH_METHOD_PASSWORD => {
                let credentials = credentials.ok_or(Socks5Error::CredentialsRequired)?;
                self.stream.write_all(&credentials.to_bytes()).await?;
                self.stream.flush().await?;
                self.state = Socks5State::AwaitingAuthResult;

                let mut status = [0u8; 2];
                self.stream.read_exact(&mut status).await?;
                expect_version(SOCKS5_AUTH_VERSION, status[0])?;
                if status[1] != SOCKS5_AUTH_SUCCESS {
                    return Err(Socks5Error::AuthenticationFailed(status[1]));
                }
                trace!("Relay accepted credentials");
            }
            SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE => return Err(Socks5Error::AuthMethodRejected),
            other => return Err(Socks5Error::UnsupportedAuthMethod(other)),
        }

        self.state = Socks5State::Ready;
        Ok(())
    }

    async fn run_connect(&mut self, destination: &DestinationDescriptor) -> Result<(), Socks5Error> {
        let mut request = Vec::with_capacity(6 + destination.raw_address.len());
        request.extend_from_slice(&[
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            socks_addr_type(destination.address_kind),
        ]);
        request.extend_from_slice(&destination.raw_address);
        request.extend_from_slice(&destination.port.to_be_bytes());

        self.stream.write_all(&request).await?;
        self.stream.flush().await?;
        self.state = Socks5State::AwaitingConnectResult;

        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header).await?;
        expect_version(SOCKS5_VERSION, header[0])?;
        if header[1] != SOCKS5_REPLY_SUCCEEDED {
            return Err(Socks5Error::ConnectRejected(header[1]));
        }

        // Consume BND.ADDR and BND.PORT so nothing of the reply reaches the client
        let addr_len = match header[3] {
            SOCKS5_ADDR_TYPE_IPV4 => 4,
            SOCKS5_ADDR_TYPE_IPV6 => 16,
            SOCKS5_ADDR_TYPE_DOMAIN => self.stream.read_u8().await? as usize,
            other => return Err(Socks5Error::UnsupportedAddressKind(other)),
        };
        let mut bound = vec![0u8; addr_len + 2];
        self.stream.read_exact(&mut bound).await?;

        self.state = Socks5State::Ready;
        debug!("Relay CONNECT to {} succeeded", destination.target());
        Ok(())
    }

    /// Mark the session failed and tear the stream down on error
    async fn settle<T>(&mut self, result: Result<T, Socks5Error>) -> Result<T, Socks5Error> {
        if let Err(e) = &result {
            debug!("SOCKS5 handshake failed while {}: {}", self.state, e);
            self.state = Socks5State::Failed;
            let _ = self.stream.shutdown().await;
        }
        result
    }
}

fn expect_version(expected: u8, actual: u8) -> Result<(), Socks5Error> {
    if actual != expected {
        return Err(Socks5Error::ProtocolVersionMismatch { expected, actual });
    }
    Ok(())
}
