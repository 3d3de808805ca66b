//! Transport module for Wsrelay
//!
//! This module provides the two endpoints a session wires together: the
//! outbound socket factory ([`Dialer`]) and the inbound message endpoint
//! produced by the WebSocket layer.

mod tcp;
pub mod ws;

pub use tcp::TcpDialer;

use crate::config::TcpConfig;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Sink, Stream};
use std::fmt::Debug;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Socket options for configuring connections
#[derive(Debug, Clone)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive timeout
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive_secs: Some(20),
            keepalive_interval: Some(8),
        }
    }
}

impl SocketOpts {
    /// Create socket options from TCP config
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        SocketOpts {
            nodelay: config.nodelay,
            keepalive_secs: Some(config.keepalive_secs),
            keepalive_interval: Some(config.keepalive_interval),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

/// Socket factory for outbound connections
///
/// Sessions dial through this trait so that the destination and the SOCKS5
/// relay connection can be substituted in tests.
#[async_trait]
pub trait Dialer: Debug + Send + Sync + 'static {
    /// The stream type produced by this dialer
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a byte stream to `host:port`
    async fn dial(&self, host: &str, port: u16) -> io::Result<Self::Stream>;
}

/// Sending half of an inbound endpoint
///
/// Every item is delivered to the client as one message. Closing the sink
/// closes the endpoint.
pub trait InboundSink: Sink<Bytes, Error = io::Error> + Unpin + Send {}

impl<T: Sink<Bytes, Error = io::Error> + Unpin + Send> InboundSink for T {}

/// Receiving half of an inbound endpoint
///
/// Yields one item per client message. The end of the stream is the close
/// event.
pub trait InboundStream: Stream<Item = io::Result<Bytes>> + Unpin + Send {}

impl<T: Stream<Item = io::Result<Bytes>> + Unpin + Send> InboundStream for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_opts_default() {
        let opts = SocketOpts::default();
        assert!(opts.nodelay);
        assert_eq!(opts.keepalive_secs, Some(20));
        assert_eq!(opts.keepalive_interval, Some(8));
    }

    #[test]
    fn test_socket_opts_from_tcp_config() {
        let config = TcpConfig {
            nodelay: false,
            keepalive_secs: 60,
            keepalive_interval: 15,
        };
        let opts = SocketOpts::from_tcp_config(&config);
        assert!(!opts.nodelay);
        assert_eq!(opts.keepalive_secs, Some(60));
        assert_eq!(opts.keepalive_interval, Some(15));
    }

    #[tokio::test]
    async fn test_socket_opts_apply() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stream, _) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let stream = stream.unwrap();

        SocketOpts::default().apply(&stream).unwrap();
        assert!(stream.nodelay().unwrap());
    }
}
