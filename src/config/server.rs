//! Server configuration types
//!
//! Defines the main configuration structures for the Wsrelay server.

use super::TcpConfig;
use crate::protocol::IDENTIFIER_LEN;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default listen address
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Default session idle timeout in seconds
fn default_idle_timeout() -> u64 {
    300
}

/// Default target for UDP/53 sessions
fn default_dns_redirect() -> SocketAddr {
    SocketAddr::from(([8, 8, 8, 8], 53))
}

/// Default early data setting
fn default_early_data() -> bool {
    true
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
}

/// Server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Client identifier as hex, dashes allowed (UUID form)
    pub user_id: String,

    /// Accept the first frame from the `Sec-WebSocket-Protocol` header
    #[serde(default = "default_early_data")]
    pub early_data: bool,

    /// Session idle timeout in seconds, 0 disables
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,

    /// Where UDP/53 sessions are sent, whatever the requested host
    #[serde(default = "default_dns_redirect")]
    pub dns_redirect: SocketAddr,

    /// TCP socket options
    #[serde(default)]
    pub tcp: TcpConfig,

    /// Upstream SOCKS5 relay
    #[serde(default)]
    pub socks: SocksRelayConfig,
}

impl ServerConfig {
    /// Decode `user_id` into the 16-byte tunnel identifier
    pub fn identifier(&self) -> Result<[u8; IDENTIFIER_LEN], String> {
        parse_identifier(&self.user_id)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.identifier()?;
        self.socks.validate()
    }
}

/// Default SOCKS5 relay connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Upstream SOCKS5 relay configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SocksRelayConfig {
    /// Route destinations through the relay instead of dialing directly
    #[serde(default)]
    pub relay: bool,

    /// Relay host
    #[serde(default)]
    pub host: Option<String>,

    /// Relay port
    #[serde(default)]
    pub port: Option<u16>,

    /// Username for RFC 1929 authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for RFC 1929 authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Transport connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for SocksRelayConfig {
    fn default() -> Self {
        Self {
            relay: false,
            host: None,
            port: None,
            username: None,
            password: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl SocksRelayConfig {
    /// Check if authentication credentials are configured
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.relay {
            return Ok(());
        }
        if self.host.as_deref().map_or(true, str::is_empty) || self.port.is_none() {
            return Err("SOCKS5 relay enabled but host or port not defined".to_string());
        }
        if (self.username.is_some() || self.password.is_some()) && !self.has_credentials() {
            return Err("SOCKS5 username and password must be set together".to_string());
        }
        for value in [&self.username, &self.password].into_iter().flatten() {
            if value.is_empty() || value.len() > 255 {
                return Err("SOCKS5 username and password must be 1 to 255 bytes".to_string());
            }
        }
        Ok(())
    }
}

/// Parse a hex identifier, ignoring dashes
pub fn parse_identifier(value: &str) -> Result<[u8; IDENTIFIER_LEN], String> {
    let cleaned: String = value.chars().filter(|c| *c != '-').collect();
    let bytes = hex::decode(&cleaned).map_err(|e| format!("Invalid user_id: {}", e))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        format!(
            "Invalid user_id: expected {} bytes, got {}",
            IDENTIFIER_LEN,
            bytes.len()
        )
    })
}
