//! ## vaktprov-protocols::arp
//! ARP for IPv4 over Ethernet (RFC 826).

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::mac::MacAddr;

pub const ARP_LEN: usize = 28;
pub const OP_REQUEST: u16 = 1;
pub const OP_REPLY: u16 = 2;

const HTYPE_ETHERNET: u16 = 1;
const PTYPE_IPV4: u16 = 0x0800;

/// ARP-specific errors.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ArpParseError {
    #[error("Insufficient data to parse ARP packet")]
    InsufficientData,
    /// Hardware/protocol types other than Ethernet/IPv4.
    #[error("Unsupported ARP address format")]
    UnsupportedAddressFormat,
}

/// Decoded ARP packet. All fields are fixed-size so the view owns them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArpPacket {
    pub operation: u16,
    pub sender_hw: MacAddr,
    pub sender_proto: Ipv4Addr,
    pub target_hw: MacAddr,
    pub target_proto: Ipv4Addr,
}

impl ArpPacket {
    pub fn is_request(&self) -> bool {
        self.operation == OP_REQUEST
    }

    pub fn is_reply(&self) -> bool {
        self.operation == OP_REPLY
    }

    /// Appends the 28-byte wire form to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&HTYPE_ETHERNET.to_be_bytes());
        buf.extend_from_slice(&PTYPE_IPV4.to_be_bytes());
        buf.push(6);
        buf.push(4);
        buf.extend_from_slice(&self.operation.to_be_bytes());
        buf.extend_from_slice(&self.sender_hw.octets());
        buf.extend_from_slice(&self.sender_proto.octets());
        buf.extend_from_slice(&self.target_hw.octets());
        buf.extend_from_slice(&self.target_proto.octets());
    }
}

/// A simple ARP parser.
#[derive(Default, Debug, Copy, Clone)]
pub struct ArpParser;

impl ArpParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, data: &[u8]) -> Result<ArpPacket, ArpParseError> {
        if data.len() < ARP_LEN {
            return Err(ArpParseError::InsufficientData);
        }
        let htype = u16::from_be_bytes([data[0], data[1]]);
        let ptype = u16::from_be_bytes([data[2], data[3]]);
        if htype != HTYPE_ETHERNET || ptype != PTYPE_IPV4 || data[4] != 6 || data[5] != 4 {
            return Err(ArpParseError::UnsupportedAddressFormat);
        }

        let ipv4 = |at: usize| Ipv4Addr::new(data[at], data[at + 1], data[at + 2], data[at + 3]);
        let mac = |at: usize| MacAddr::from_slice(&data[at..at + 6]).unwrap_or_default();

        Ok(ArpPacket {
            operation: u16::from_be_bytes([data[6], data[7]]),
            sender_hw: mac(8),
            sender_proto: ipv4(14),
            target_hw: mac(18),
            target_proto: ipv4(24),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn request() -> ArpPacket {
        ArpPacket {
            operation: OP_REQUEST,
            sender_hw: "30:00:00:00:00:01".parse().unwrap(),
            sender_proto: Ipv4Addr::new(10, 1, 1, 1),
            target_hw: MacAddr::BROADCAST,
            target_proto: Ipv4Addr::new(10, 1, 1, 2),
        }
    }

    #[test]
    fn test_wire_form_parses_back() {
        let mut raw = Vec::new();
        request().write_to(&mut raw);
        assert_eq!(raw.len(), ARP_LEN);

        let parsed = ArpParser::new().parse(&Bytes::from(raw)).unwrap();
        assert_eq!(parsed, request());
        assert!(parsed.is_request());
    }

    #[test]
    fn test_rejects_non_ipv4_protocol() {
        let mut raw = Vec::new();
        request().write_to(&mut raw);
        raw[2] = 0x86;
        raw[3] = 0xdd;
        assert!(matches!(
            ArpParser::new().parse(&raw),
            Err(ArpParseError::UnsupportedAddressFormat)
        ));
    }

    #[test]
    fn test_insufficient_data() {
        assert!(matches!(
            ArpParser::new().parse(&[0u8; 27]),
            Err(ArpParseError::InsufficientData)
        ));
    }
}
