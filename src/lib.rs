//! # Wsrelay - WebSocket Tunneling Proxy
//!
//! Wsrelay accepts WebSocket connections carrying a small binary tunnel
//! protocol. The first frame of each connection names a destination; the
//! server dials it, either directly or through an upstream SOCKS5 relay, and
//! then relays bytes both ways until either side closes.
//!
//! ## Features
//!
//! - **Tunnel Header Decoding**: Identifier check, IPv4/domain/IPv6 destinations
//! - **SOCKS5 Relay Client**: Optional upstream relay with username/password auth
//! - **Early Data**: First frame carried in the `Sec-WebSocket-Protocol` header
//! - **DNS over UDP Command**: UDP/53 sessions redirected to a fixed resolver
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wsrelay::config::load_config;
//! use wsrelay::server::Server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     Server::bind(&config.server).await?.run(shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! WebSocket Client -> Wsrelay -> [SOCKS5 Relay] -> Destination
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod helper;
pub mod protocol;
pub mod server;
pub mod session;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{HeaderError, SessionError, Socks5Error};
pub use server::Server;
pub use session::SessionRelay;
pub use socks::Socks5Client;

/// Version of the Wsrelay library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "wsrelay");
    }
}
