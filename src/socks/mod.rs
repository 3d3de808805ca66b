//! SOCKS5 module for Wsrelay
//!
//! This module implements the client side of SOCKS5 (RFC 1928 method
//! negotiation, RFC 1929 username/password and CONNECT), used to reach
//! destinations through an upstream relay.

mod client;
mod consts;
mod types;

pub use client::{Socks5Client, Socks5Session};
pub use consts::*;
pub use types::{socks_addr_type, Credentials, Socks5State};
