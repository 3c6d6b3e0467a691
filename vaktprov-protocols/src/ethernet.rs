//! ## vaktprov-protocols::ethernet
//! Zero-copy Ethernet II frame parser.

use thiserror::Error;

use crate::mac::MacAddr;

pub const HEADER_LEN: usize = 14;
pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// Ethernet-specific errors.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EthernetParseError {
    /// The frame is shorter than the 14-byte header.
    #[error("Insufficient data to parse Ethernet frame")]
    InsufficientData,
}

/// Ethernet II frame with a zero-copy slice of its payload.
#[derive(Debug, Copy, Clone)]
pub struct EthernetFrame<'a> {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
    pub payload: &'a [u8],
}

/// A simple Ethernet II parser.
#[derive(Default, Debug, Copy, Clone)]
pub struct EthernetParser;

impl EthernetParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses an Ethernet II frame. VLAN tags are not interpreted.
    pub fn parse<'a>(&self, data: &'a [u8]) -> Result<EthernetFrame<'a>, EthernetParseError> {
        if data.len() < HEADER_LEN {
            return Err(EthernetParseError::InsufficientData);
        }
        let dst = MacAddr::from_slice(&data[0..6]).ok_or(EthernetParseError::InsufficientData)?;
        let src = MacAddr::from_slice(&data[6..12]).ok_or(EthernetParseError::InsufficientData)?;
        let ethertype = u16::from_be_bytes([data[12], data[13]]);

        Ok(EthernetFrame {
            dst,
            src,
            ethertype,
            payload: &data[HEADER_LEN..],
        })
    }
}

/// Appends an Ethernet II header to `buf`.
pub fn write_header(buf: &mut Vec<u8>, dst: MacAddr, src: MacAddr, ethertype: u16) {
    buf.extend_from_slice(&dst.octets());
    buf.extend_from_slice(&src.octets());
    buf.extend_from_slice(&ethertype.to_be_bytes());
}
