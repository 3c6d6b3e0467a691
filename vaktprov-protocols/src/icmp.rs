//! ## vaktprov-protocols::icmp
//! Zero-copy ICMPv4 parser.

use thiserror::Error;

pub const HEADER_LEN: usize = 8;
pub const CHECKSUM_OFFSET: usize = 2;

pub const TYPE_ECHO_REPLY: u8 = 0;
pub const TYPE_DESTINATION_UNREACHABLE: u8 = 3;
pub const TYPE_ECHO_REQUEST: u8 = 8;
pub const TYPE_TIME_EXCEEDED: u8 = 11;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum IcmpParseError {
    #[error("Insufficient data to parse ICMP message")]
    InsufficientData,
}

/// ICMP message. `rest` is the type-specific second word (identifier and
/// sequence for echo messages, unused/MTU for errors); `data` is everything
/// after it.
#[derive(Debug, Copy, Clone)]
pub struct IcmpPacket<'a> {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub rest: [u8; 4],
    pub data: &'a [u8],
}

impl IcmpPacket<'_> {
    pub fn is_echo(&self) -> bool {
        matches!(self.icmp_type, TYPE_ECHO_REQUEST | TYPE_ECHO_REPLY)
    }

    /// Echo sequence number; meaningless for error messages.
    pub fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.rest[2], self.rest[3]])
    }

    pub fn type_name(&self) -> &'static str {
        match self.icmp_type {
            TYPE_ECHO_REPLY => "EchoReply",
            TYPE_DESTINATION_UNREACHABLE => "DestinationUnreachable",
            TYPE_ECHO_REQUEST => "EchoRequest",
            TYPE_TIME_EXCEEDED => "TimeExceeded",
            _ => "Other",
        }
    }
}

#[derive(Default, Debug, Copy, Clone)]
pub struct IcmpParser;

impl IcmpParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse<'a>(&self, data: &'a [u8]) -> Result<IcmpPacket<'a>, IcmpParseError> {
        if data.len() < HEADER_LEN {
            return Err(IcmpParseError::InsufficientData);
        }
        Ok(IcmpPacket {
            icmp_type: data[0],
            code: data[1],
            checksum: u16::from_be_bytes([data[2], data[3]]),
            rest: [data[4], data[5], data[6], data[7]],
            data: &data[HEADER_LEN..],
        })
    }
}
