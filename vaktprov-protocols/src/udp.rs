//! ## vaktprov-protocols::udp
//! Zero-copy UDP parser.

use thiserror::Error;

pub const HEADER_LEN: usize = 8;
pub const CHECKSUM_OFFSET: usize = 6;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum UdpParseError {
    #[error("Insufficient data to parse UDP datagram")]
    InsufficientData,
    #[error("Malformed UDP length field")]
    InvalidLength,
}

#[derive(Debug, Copy, Clone)]
pub struct UdpDatagram<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
    pub payload: &'a [u8],
}

#[derive(Default, Debug, Copy, Clone)]
pub struct UdpParser;

impl UdpParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse<'a>(&self, data: &'a [u8]) -> Result<UdpDatagram<'a>, UdpParseError> {
        if data.len() < HEADER_LEN {
            return Err(UdpParseError::InsufficientData);
        }
        let length = u16::from_be_bytes([data[4], data[5]]);
        if usize::from(length) < HEADER_LEN {
            return Err(UdpParseError::InvalidLength);
        }
        let end = usize::from(length).min(data.len());

        Ok(UdpDatagram {
            src_port: u16::from_be_bytes([data[0], data[1]]),
            dst_port: u16::from_be_bytes([data[2], data[3]]),
            length,
            checksum: u16::from_be_bytes([data[6], data[7]]),
            payload: &data[HEADER_LEN..end],
        })
    }
}
