//! SOCKS5 protocol constants
//!
//! Constants for the client side of RFC 1928 and RFC 1929.

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

/// SOCKS5 authentication sub-negotiation version
pub const SOCKS5_AUTH_VERSION: u8 = 0x01;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// Username/password authentication
pub const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

/// Greeting offering no-auth and username/password
pub const SOCKS5_GREETING: [u8; 4] = [
    SOCKS5_VERSION,
    0x02,
    SOCKS5_AUTH_METHOD_NONE,
    SOCKS5_AUTH_METHOD_PASSWORD,
];

/// Username/password sub-negotiation success status
pub const SOCKS5_AUTH_SUCCESS: u8 = 0x00;

// Commands
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

/// Succeeded reply code
pub const SOCKS5_REPLY_SUCCEEDED: u8 = 0x00;

/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

/// Default relay connect timeout in seconds
pub const SOCKS5_CONNECT_TIMEOUT_SECS: u64 = 10;
