//! Test utilities and mocks for Wsrelay
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use futures::channel::mpsc;
use futures::SinkExt;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wsrelay::protocol::{encode, Command, DestinationDescriptor, IDENTIFIER_LEN};
use wsrelay::transport::{InboundSink, InboundStream};

/// Identifier used by every test server
pub const TEST_USER_ID: &str = "d342d11e-d424-4583-b36e-524ab1f0afa4";

/// Decoded form of [`TEST_USER_ID`]
pub fn test_identifier() -> [u8; IDENTIFIER_LEN] {
    wsrelay::config::parse_identifier(TEST_USER_ID).unwrap()
}

/// Build a request frame for `addr` with a trailing payload
pub fn build_frame(addr: SocketAddr, command: Command, payload: &[u8]) -> Bytes {
    let destination = DestinationDescriptor::from_socket_addr(addr, command);
    encode(0, &test_identifier(), &destination, &[], payload).unwrap()
}

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Inbound endpoint backed by channels, plus the client-side ends
pub fn channel_endpoint() -> (
    impl InboundSink,
    impl InboundStream,
    mpsc::Sender<io::Result<Bytes>>,
    mpsc::Receiver<Bytes>,
) {
    let (client_tx, inbound_rx) = mpsc::channel::<io::Result<Bytes>>(16);
    let (inbound_tx, client_rx) = mpsc::channel::<Bytes>(16);
    let inbound_tx = inbound_tx.sink_map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e));
    (inbound_tx, inbound_rx, client_tx, client_rx)
}

/// Spawn a TCP echo server
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// Mock SOCKS5 relay
///
/// Supports no-auth or username/password, answers CONNECT to an IPv4
/// destination and then splices the client to that destination. Every
/// CONNECT target is reported on the returned channel.
pub mod socks5_mock {
    use super::*;
    use tokio::sync::mpsc as tokio_mpsc;
    use wsrelay::socks::*;

    /// Spawn the relay, optionally requiring `(username, password)`
    pub async fn spawn_socks_relay(
        credentials: Option<(&'static str, &'static str)>,
    ) -> (SocketAddr, tokio_mpsc::UnboundedReceiver<SocketAddr>) {
        let (listener, addr) = create_test_listener().await;
        let (targets_tx, targets_rx) = tokio_mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let targets_tx = targets_tx.clone();
                tokio::spawn(async move {
                    if let Ok((client, target)) = handshake(stream, credentials).await {
                        let _ = targets_tx.send(target);
                        splice(client, target).await;
                    }
                });
            }
        });

        (addr, targets_rx)
    }

    async fn handshake(
        mut stream: TcpStream,
        credentials: Option<(&str, &str)>,
    ) -> io::Result<(TcpStream, SocketAddr)> {
        let mut greeting = [0u8; 2];
        stream.read_exact(&mut greeting).await?;
        let mut methods = vec![0u8; greeting[1] as usize];
        stream.read_exact(&mut methods).await?;

        match credentials {
            None => {
                stream
                    .write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
                    .await?
            }
            Some((username, password)) => {
                stream
                    .write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_PASSWORD])
                    .await?;

                let mut header = [0u8; 2];
                stream.read_exact(&mut header).await?;
                let mut user = vec![0u8; header[1] as usize];
                stream.read_exact(&mut user).await?;
                let mut pass_len = [0u8; 1];
                stream.read_exact(&mut pass_len).await?;
                let mut pass = vec![0u8; pass_len[0] as usize];
                stream.read_exact(&mut pass).await?;

                let ok = user == username.as_bytes() && pass == password.as_bytes();
                stream
                    .write_all(&[SOCKS5_AUTH_VERSION, if ok { 0x00 } else { 0x01 }])
                    .await?;
                if !ok {
                    return Err(io::Error::new(io::ErrorKind::PermissionDenied, "bad auth"));
                }
            }
        }

        let mut request = [0u8; 4];
        stream.read_exact(&mut request).await?;
        if request[3] != SOCKS5_ADDR_TYPE_IPV4 {
            let mut reply = [0u8; 10];
            reply[..4].copy_from_slice(&[SOCKS5_VERSION, 0x08, SOCKS5_RESERVED, SOCKS5_ADDR_TYPE_IPV4]);
            stream.write_all(&reply).await?;
            return Err(io::Error::new(io::ErrorKind::Unsupported, "address type"));
        }
        let mut ip = [0u8; 4];
        stream.read_exact(&mut ip).await?;
        let port = stream.read_u16().await?;

        stream
            .write_all(&[
                SOCKS5_VERSION,
                SOCKS5_REPLY_SUCCEEDED,
                SOCKS5_RESERVED,
                SOCKS5_ADDR_TYPE_IPV4,
                0,
                0,
                0,
                0,
                0,
                0,
            ])
            .await?;

        Ok((stream, SocketAddr::from((ip, port))))
    }

    async fn splice(mut client: TcpStream, target: SocketAddr) {
        if let Ok(mut upstream) = TcpStream::connect(target).await {
            let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
        }
    }
}

/// Test configuration builder
pub struct TestConfigBuilder {
    early_data: bool,
    idle_timeout: u64,
    relay: Option<(SocketAddr, Option<(String, String)>)>,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        TestConfigBuilder {
            early_data: true,
            idle_timeout: 0,
            relay: None,
        }
    }
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable early data
    pub fn early_data(mut self, enabled: bool) -> Self {
        self.early_data = enabled;
        self
    }

    /// Set the idle timeout in seconds
    pub fn idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout = secs;
        self
    }

    /// Route through a SOCKS5 relay
    pub fn relay(mut self, addr: SocketAddr, credentials: Option<(&str, &str)>) -> Self {
        self.relay = Some((
            addr,
            credentials.map(|(u, p)| (u.to_string(), p.to_string())),
        ));
        self
    }

    /// Build the configuration
    pub fn build(self) -> wsrelay::config::Config {
        let mut socks = wsrelay::config::SocksRelayConfig::default();
        if let Some((addr, credentials)) = self.relay {
            socks.relay = true;
            socks.host = Some(addr.ip().to_string());
            socks.port = Some(addr.port());
            if let Some((username, password)) = credentials {
                socks.username = Some(username);
                socks.password = Some(password);
            }
        }

        wsrelay::config::Config {
            server: wsrelay::config::ServerConfig {
                bind_addr: "127.0.0.1:0".to_string(),
                user_id: TEST_USER_ID.to_string(),
                early_data: self.early_data,
                idle_timeout: self.idle_timeout,
                dns_redirect: SocketAddr::from(([8, 8, 8, 8], 53)),
                tcp: wsrelay::config::TcpConfig::default(),
                socks,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_server() {
        let addr = spawn_echo_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_config_builder() {
        let config = TestConfigBuilder::new()
            .early_data(false)
            .relay("127.0.0.1:1080".parse().unwrap(), Some(("u", "p")))
            .build();

        assert!(!config.server.early_data);
        assert!(config.server.socks.relay);
        assert!(config.server.socks.has_credentials());
        assert!(config.server.validate().is_ok());
    }
}
