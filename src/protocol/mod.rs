//! Tunnel protocol module
//!
//! This module implements the binary request header that opens every
//! tunnel session, and the acknowledgement sent back to the client.

mod codec;
mod types;

pub use codec::{decode, encode};
pub use types::{
    format_ipv6, AddressKind, Command, DecodedHeader, DestinationDescriptor, IDENTIFIER_LEN,
    MIN_FRAME_LEN,
};
