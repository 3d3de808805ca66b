//! Configuration module for Wsrelay
//!
//! This module provides configuration types and parsing for the server.

mod server;
mod transport;

pub use server::{parse_identifier, Config, ServerConfig, SocksRelayConfig};
pub use transport::TcpConfig;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .server
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config_str = r#"
[server]
user_id = "d342d11e-d424-4583-b36e-524ab1f0afa4"
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert!(config.server.early_data);
        assert_eq!(config.server.idle_timeout, 300);
        assert_eq!(config.server.dns_redirect.to_string(), "8.8.8.8:53");
        assert!(!config.server.socks.relay);
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[server]
bind_addr = "127.0.0.1:9000"
user_id = "d342d11e-d424-4583-b36e-524ab1f0afa4"
early_data = false
idle_timeout = 0
dns_redirect = "1.1.1.1:53"

[server.tcp]
nodelay = false
keepalive_secs = 30
keepalive_interval = 10

[server.socks]
relay = true
host = "proxy.local"
port = 1080
username = "user"
password = "pass"
connect_timeout = 5
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert!(!config.server.early_data);
        assert_eq!(config.server.idle_timeout, 0);
        assert_eq!(config.server.dns_redirect.to_string(), "1.1.1.1:53");
        assert!(!config.server.tcp.nodelay);
        assert!(config.server.socks.relay);
        assert_eq!(config.server.socks.host.as_deref(), Some("proxy.local"));
        assert_eq!(config.server.socks.port, Some(1080));
        assert!(config.server.socks.has_credentials());
        assert_eq!(config.server.socks.connect_timeout, 5);
    }

    #[test]
    fn test_parse_config_rejects_bad_identifier() {
        let config_str = r#"
[server]
user_id = "1234"
"#;
        assert!(parse_config(config_str).is_err());
    }

    #[test]
    fn test_parse_config_rejects_relay_without_host() {
        let config_str = r#"
[server]
user_id = "d342d11e-d424-4583-b36e-524ab1f0afa4"

[server.socks]
relay = true
"#;
        assert!(parse_config(config_str).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "user_id = \"000102030405060708090a0b0c0d0e0f\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.identifier().unwrap()[15], 0x0f);
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("/nonexistent/wsrelay.toml").is_err());
    }
}
