//! Tunnel header codec
//!
//! Decodes the request header that opens every tunnel session.
//!
//! # Request Format
//!
//! ```text
//! +-----+------------+------+-----------+-----+------+------+----------+---------+
//! | VER | IDENTIFIER | OLEN |  OPTIONS  | CMD | PORT | ATYP |   ADDR   | PAYLOAD |
//! +-----+------------+------+-----------+-----+------+------+----------+---------+
//! |  1  |     16     |  1   | OLEN bytes|  1  |  2   |  1   | Variable | Variable|
//! +-----+------------+------+-----------+-----+------+------+----------+---------+
//! ```
//!
//! The options block is opaque and skipped.

use super::types::*;
use crate::error::HeaderError;
use bytes::{BufMut, Bytes, BytesMut};

/// Decode a request header from the first frame of a session
///
/// Returns the destination and the offset at which the tunneled payload
/// starts. The frame is not modified.
pub fn decode(
    frame: &[u8],
    expected_identifier: &[u8; IDENTIFIER_LEN],
) -> Result<DecodedHeader, HeaderError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(HeaderError::MalformedHeader);
    }

    let version = frame[0];
    if &frame[1..OPTIONS_LEN_OFFSET] != expected_identifier {
        return Err(HeaderError::IdentifierMismatch);
    }

    let options_len = frame[OPTIONS_LEN_OFFSET] as usize;
    let command_offset = OPTIONS_LEN_OFFSET + 1 + options_len;

    // CMD + PORT + ATYP
    let fixed = field(frame, command_offset, 4)?;
    let command =
        Command::from_byte(fixed[0]).ok_or(HeaderError::UnsupportedCommand(fixed[0]))?;
    let port = u16::from_be_bytes([fixed[1], fixed[2]]);
    let address_kind =
        AddressKind::from_byte(fixed[3]).ok_or(HeaderError::UnsupportedAddressKind(fixed[3]))?;

    let address_offset = command_offset + 4;
    let (host, raw_address) = match address_kind {
        AddressKind::Ipv4 => {
            let raw = field(frame, address_offset, 4)?;
            let host = raw
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(".");
            (host, raw)
        }
        AddressKind::Domain => {
            let len = *frame
                .get(address_offset)
                .ok_or(HeaderError::MalformedHeader)? as usize;
            let raw = field(frame, address_offset, 1 + len)?;
            (String::from_utf8_lossy(&raw[1..]).into_owned(), raw)
        }
        AddressKind::Ipv6 => {
            let raw = field(frame, address_offset, 16)?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(raw);
            (format_ipv6(&octets), raw)
        }
    };

    Ok(DecodedHeader {
        version,
        destination: DestinationDescriptor {
            host,
            port,
            address_kind,
            raw_address: Bytes::copy_from_slice(raw_address),
            command,
        },
        payload_offset: address_offset + raw_address.len(),
    })
}

/// Encode a request frame carrying `payload` to `destination`
///
/// Fails with `MalformedHeader` when `options` does not fit its one-byte
/// length field.
pub fn encode(
    version: u8,
    identifier: &[u8; IDENTIFIER_LEN],
    destination: &DestinationDescriptor,
    options: &[u8],
    payload: &[u8],
) -> Result<Bytes, HeaderError> {
    let options_len = u8::try_from(options.len()).map_err(|_| HeaderError::MalformedHeader)?;

    let mut buf = BytesMut::with_capacity(
        MIN_FRAME_LEN + options.len() + destination.raw_address.len() + payload.len(),
    );
    buf.put_u8(version);
    buf.put_slice(identifier);
    buf.put_u8(options_len);
    buf.put_slice(options);
    buf.put_u8(destination.command.to_byte());
    buf.put_u16(destination.port);
    buf.put_u8(destination.address_kind.to_byte());
    buf.put_slice(&destination.raw_address);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

fn field(frame: &[u8], offset: usize, len: usize) -> Result<&[u8], HeaderError> {
    frame
        .get(offset..offset + len)
        .ok_or(HeaderError::MalformedHeader)
}
