//! SOCKS5 client type definitions
//!
//! Defines the handshake state and the values a relay handshake needs.

use super::consts::*;
use crate::protocol::AddressKind;
use std::fmt;

/// Handshake state of a relay connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Socks5State {
    /// Transport connected, greeting not sent yet
    Connecting,
    /// Greeting sent, waiting for the selected method
    AwaitingMethodChoice,
    /// Credentials sent, waiting for the status
    AwaitingAuthResult,
    /// CONNECT sent, waiting for the reply
    AwaitingConnectResult,
    /// Negotiation done, CONNECT can be issued
    Ready,
    /// Handshake failed, the connection is unusable
    Failed,
}

impl fmt::Display for Socks5State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Socks5State::Connecting => "connecting",
            Socks5State::AwaitingMethodChoice => "awaiting method choice",
            Socks5State::AwaitingAuthResult => "awaiting auth result",
            Socks5State::AwaitingConnectResult => "awaiting connect result",
            Socks5State::Ready => "ready",
            Socks5State::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Username/password pair for RFC 1929
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Encode the sub-negotiation request
    ///
    /// ```text
    /// +----+------+----------+------+----------+
    /// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
    /// +----+------+----------+------+----------+
    /// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
    /// +----+------+----------+------+----------+
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3 + self.username.len() + self.password.len());
        bytes.push(SOCKS5_AUTH_VERSION);
        bytes.push(self.username.len() as u8);
        bytes.extend_from_slice(self.username.as_bytes());
        bytes.push(self.password.len() as u8);
        bytes.extend_from_slice(self.password.as_bytes());
        bytes
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SOCKS5 address type byte for a tunnel address kind
pub fn socks_addr_type(kind: AddressKind) -> u8 {
    match kind {
        AddressKind::Ipv4 => SOCKS5_ADDR_TYPE_IPV4,
        AddressKind::Domain => SOCKS5_ADDR_TYPE_DOMAIN,
        AddressKind::Ipv6 => SOCKS5_ADDR_TYPE_IPV6,
    }
}
