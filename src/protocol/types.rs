//! Tunnel protocol type definitions
//!
//! Defines the decoded form of a tunnel request header.

use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;

/// Minimum length of a request frame
pub const MIN_FRAME_LEN: usize = 24;

/// Length of the client identifier
pub const IDENTIFIER_LEN: usize = 16;

/// Offset of the options length byte
pub const OPTIONS_LEN_OFFSET: usize = 1 + IDENTIFIER_LEN;

// Commands
/// Stream (TCP) command
pub const CMD_TCP: u8 = 0x01;
/// Datagram (UDP) command
pub const CMD_UDP: u8 = 0x02;

// Address types
/// IPv4 address
pub const ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const ADDR_TYPE_DOMAIN: u8 = 0x02;
/// IPv6 address
pub const ADDR_TYPE_IPV6: u8 = 0x03;

/// Transport requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Byte stream
    Tcp,
    /// Datagrams, relayed for DNS only
    Udp,
}

impl Command {
    /// Parse a command byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_TCP => Some(Command::Tcp),
            CMD_UDP => Some(Command::Udp),
            _ => None,
        }
    }

    /// Convert to the wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            Command::Tcp => CMD_TCP,
            Command::Udp => CMD_UDP,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Tcp => write!(f, "TCP"),
            Command::Udp => write!(f, "UDP"),
        }
    }
}

/// Kind of destination address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// 4-byte IPv4 address
    Ipv4,
    /// Length-prefixed domain name
    Domain,
    /// 16-byte IPv6 address
    Ipv6,
}

impl AddressKind {
    /// Parse a tunnel address type byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ADDR_TYPE_IPV4 => Some(AddressKind::Ipv4),
            ADDR_TYPE_DOMAIN => Some(AddressKind::Domain),
            ADDR_TYPE_IPV6 => Some(AddressKind::Ipv6),
            _ => None,
        }
    }

    /// Convert to the tunnel address type byte
    pub fn to_byte(self) -> u8 {
        match self {
            AddressKind::Ipv4 => ADDR_TYPE_IPV4,
            AddressKind::Domain => ADDR_TYPE_DOMAIN,
            AddressKind::Ipv6 => ADDR_TYPE_IPV6,
        }
    }
}

/// Destination decoded from the request header
///
/// `raw_address` holds the address exactly as it appeared on the wire. For
/// domains the length byte is kept in front of the name, which is also how
/// SOCKS5 encodes a domain, so the bytes can be reused for CONNECT as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDescriptor {
    /// Printable host (dotted IPv4, domain text, or IPv6 groups)
    pub host: String,
    /// Destination port
    pub port: u16,
    /// Kind of address
    pub address_kind: AddressKind,
    /// Wire-format address bytes
    pub raw_address: Bytes,
    /// Requested transport
    pub command: Command,
}

impl DestinationDescriptor {
    /// Build a descriptor for a fixed socket address
    pub fn from_socket_addr(addr: SocketAddr, command: Command) -> Self {
        match addr {
            SocketAddr::V4(v4) => DestinationDescriptor {
                host: v4.ip().to_string(),
                port: v4.port(),
                address_kind: AddressKind::Ipv4,
                raw_address: Bytes::copy_from_slice(&v4.ip().octets()),
                command,
            },
            SocketAddr::V6(v6) => {
                let octets = v6.ip().octets();
                DestinationDescriptor {
                    host: format_ipv6(&octets),
                    port: v6.port(),
                    address_kind: AddressKind::Ipv6,
                    raw_address: Bytes::copy_from_slice(&octets),
                    command,
                }
            }
        }
    }

    /// `host:port` form used for dialing and logging
    pub fn target(&self) -> String {
        match self.address_kind {
            AddressKind::Ipv6 => format!("[{}]:{}", self.host, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Display for DestinationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.command, self.target())
    }
}

/// A decoded request header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHeader {
    /// Protocol version, echoed back in the acknowledgement
    pub version: u8,
    /// Requested destination
    pub destination: DestinationDescriptor,
    /// Index in the frame where the tunneled payload starts
    pub payload_offset: usize,
}

impl DecodedHeader {
    /// Acknowledgement sent back to the client before any relayed bytes
    pub fn response(&self) -> [u8; 2] {
        [self.version, 0x00]
    }
}

/// Render 16 address bytes as eight 4-digit hex groups, without zero compression
pub fn format_ipv6(octets: &[u8; 16]) -> String {
    octets
        .chunks(2)
        .map(|pair| format!("{:02x}{:02x}", pair[0], pair[1]))
        .collect::<Vec<_>>()
        .join(":")
}
