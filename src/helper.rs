//! Helper utilities for Wsrelay
//!
//! This module provides common constants and small utility functions used
//! throughout the application.

use std::time::Duration;

/// Default buffer size for IO operations
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Destination port of the only UDP traffic that is relayed
pub const DNS_PORT: u16 = 53;

/// Parse duration from seconds
pub fn duration_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// Parse an optional timeout from seconds, where 0 means disabled
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| duration_from_secs(secs))
}
