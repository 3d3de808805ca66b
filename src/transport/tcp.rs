//! TCP dialer implementation
//!
//! Opens plain TCP connections to destinations and to the SOCKS5 relay.

use super::{Dialer, SocketOpts};
use async_trait::async_trait;
use std::io;
use tokio::net::TcpStream;

/// Dialer producing plain TCP connections
#[derive(Debug, Clone, Default)]
pub struct TcpDialer {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
}

impl TcpDialer {
    /// Create a new TCP dialer with the given socket options
    pub fn new(socket_opts: SocketOpts) -> Self {
        TcpDialer { socket_opts }
    }

    /// Socket options applied to every connection
    pub fn socket_opts(&self) -> &SocketOpts {
        &self.socket_opts
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;

        if let Err(e) = self.socket_opts.apply(&stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }

        tracing::debug!("TCP connection established to {}:{}", host, port);

        Ok(stream)
    }
}
