//! Error types for Wsrelay
//!
//! This module defines the error taxonomy of a tunnel session: header decode
//! failures, SOCKS5 relay handshake failures and session-level failures.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Tunnel header decode errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Frame too short, a declared length runs past the end of the frame, or
    /// a field is too long to encode
    #[error("Malformed tunnel header")]
    MalformedHeader,

    /// Embedded identifier does not match the configured one
    #[error("Tunnel identifier mismatch")]
    IdentifierMismatch,

    /// Command byte is neither TCP nor UDP
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(u8),

    /// Address type byte is not IPv4, domain or IPv6
    #[error("Unsupported address type: {0}")]
    UnsupportedAddressKind(u8),
}

/// SOCKS5 relay handshake errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Transport connect to the relay failed or timed out
    #[error("SOCKS5 relay unreachable: {0}")]
    RelayUnreachable(String),

    /// Relay answered with an unexpected version byte
    #[error("Unexpected version from relay: expected {expected}, got {actual}")]
    ProtocolVersionMismatch {
        /// Version the client expected
        expected: u8,
        /// Version the relay sent
        actual: u8,
    },

    /// Relay accepted none of the offered methods
    #[error("Relay didn't accept offered auth methods")]
    AuthMethodRejected,

    /// Relay selected a method that was never offered
    #[error("Unsupported auth method selected by relay: 0x{0:02x}")]
    UnsupportedAuthMethod(u8),

    /// Relay requires username/password but none is configured
    #[error("Relay requires username and password")]
    CredentialsRequired,

    /// Username/password sub-negotiation failed
    #[error("Relay authentication failed (status 0x{0:02x})")]
    AuthenticationFailed(u8),

    /// CONNECT was answered with a non-zero reply code
    #[error("Relay rejected CONNECT: {}", describe_reply(*.0))]
    ConnectRejected(u8),

    /// Bound address in the CONNECT reply has an unknown type
    #[error("Address type not supported in relay reply: {0}")]
    UnsupportedAddressKind(u8),

    /// Transport error or premature close during the handshake
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Session-level errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// First frame failed to decode
    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    /// Destination could not be reached through the SOCKS5 relay
    #[error("Relay failure: {0}")]
    Relay(#[from] Socks5Error),

    /// Direct dial to the destination failed
    #[error("Destination {target} unreachable: {source}")]
    DestinationUnreachable {
        /// `host:port` that was dialed
        target: String,
        /// Underlying connect error
        #[source]
        source: io::Error,
    },

    /// UDP is only relayed for DNS
    #[error("UDP destination port {0} rejected, only DNS is relayed")]
    UdpPortRejected(u16),

    /// Inbound endpoint closed before the first frame arrived
    #[error("Inbound endpoint closed before first frame")]
    InboundClosed,

    /// Handshake, first frame or destination setup took longer than the idle timeout
    #[error("Session setup timed out after {0:?}")]
    SetupTimeout(Duration),

    /// IO error while relaying
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl Socks5ReplyCode {
    /// Human-readable meaning of the reply code
    pub fn description(self) -> &'static str {
        match self {
            Socks5ReplyCode::Succeeded => "succeeded",
            Socks5ReplyCode::GeneralFailure => "general SOCKS server failure",
            Socks5ReplyCode::ConnectionNotAllowed => "connection not allowed by ruleset",
            Socks5ReplyCode::NetworkUnreachable => "network unreachable",
            Socks5ReplyCode::HostUnreachable => "host unreachable",
            Socks5ReplyCode::ConnectionRefused => "connection refused",
            Socks5ReplyCode::TtlExpired => "TTL expired",
            Socks5ReplyCode::CommandNotSupported => "command not supported",
            Socks5ReplyCode::AddressTypeNotSupported => "address type not supported",
        }
    }
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks5ReplyCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Socks5ReplyCode::Succeeded),
            0x01 => Ok(Socks5ReplyCode::GeneralFailure),
            0x02 => Ok(Socks5ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(Socks5ReplyCode::NetworkUnreachable),
            0x04 => Ok(Socks5ReplyCode::HostUnreachable),
            0x05 => Ok(Socks5ReplyCode::ConnectionRefused),
            0x06 => Ok(Socks5ReplyCode::TtlExpired),
            0x07 => Ok(Socks5ReplyCode::CommandNotSupported),
            0x08 => Ok(Socks5ReplyCode::AddressTypeNotSupported),
            other => Err(other),
        }
    }
}

fn describe_reply(code: u8) -> String {
    match Socks5ReplyCode::try_from(code) {
        Ok(reply) => format!("{} (0x{:02x})", reply.description(), code),
        Err(code) => format!("unknown reply code 0x{:02x}", code),
    }
}
