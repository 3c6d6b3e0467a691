//! ## vaktprov-protocols::ipv4
//! Zero-copy IPv4 header parser.

use std::net::Ipv4Addr;

use thiserror::Error;

pub const MIN_HEADER_LEN: usize = 20;
pub const PROTO_ICMP: u8 = 1;
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

/// Byte offsets of header fields, relative to the start of the IPv4 header.
pub const IDENT_OFFSET: usize = 4;
pub const TTL_OFFSET: usize = 8;
pub const CHECKSUM_OFFSET: usize = 10;

/// IPv4-specific errors.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Ipv4ParseError {
    #[error("Insufficient data to parse IPv4 header")]
    InsufficientData,
    #[error("Invalid IP version")]
    InvalidVersion,
    #[error("Invalid IPv4 header length")]
    InvalidHeaderLength,
}

/// IPv4 header with a zero-copy slice of the payload.
#[derive(Debug, Copy, Clone)]
pub struct Ipv4Packet<'a> {
    /// Header length in bytes (IHL * 4).
    pub header_len: usize,
    pub total_len: u16,
    pub ident: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    /// Payload bounded by `total_len` (or by the captured data, if shorter).
    pub payload: &'a [u8],
}

/// A simple IPv4 parser.
#[derive(Default, Debug, Copy, Clone)]
pub struct Ipv4Parser;

impl Ipv4Parser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse<'a>(&self, data: &'a [u8]) -> Result<Ipv4Packet<'a>, Ipv4ParseError> {
        if data.len() < MIN_HEADER_LEN {
            return Err(Ipv4ParseError::InsufficientData);
        }
        if data[0] >> 4 != 4 {
            return Err(Ipv4ParseError::InvalidVersion);
        }
        let header_len = usize::from(data[0] & 0x0F) * 4;
        if header_len < MIN_HEADER_LEN {
            return Err(Ipv4ParseError::InvalidHeaderLength);
        }
        if data.len() < header_len {
            return Err(Ipv4ParseError::InsufficientData);
        }

        let total_len = u16::from_be_bytes([data[2], data[3]]);
        if usize::from(total_len) < header_len {
            return Err(Ipv4ParseError::InvalidHeaderLength);
        }
        let end = usize::from(total_len).min(data.len());

        Ok(Ipv4Packet {
            header_len,
            total_len,
            ident: u16::from_be_bytes([data[IDENT_OFFSET], data[IDENT_OFFSET + 1]]),
            ttl: data[TTL_OFFSET],
            protocol: data[9],
            checksum: u16::from_be_bytes([data[CHECKSUM_OFFSET], data[CHECKSUM_OFFSET + 1]]),
            src: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            dst: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            payload: &data[header_len..end],
        })
    }
}
