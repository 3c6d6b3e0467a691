//! Header fields that may be masked out of an exact packet match.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vaktprov_protocols::{icmp, ipv4, udp, Frame, HeaderKind};

use crate::error::ScenarioError;

/// A field whose bytes are ignored when an output event is matched exactly,
/// e.g. a TTL the router is expected to decrement or a checksum that follows
/// from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wildcard {
    #[serde(rename = "eth.src")]
    EthSrc,
    #[serde(rename = "eth.dst")]
    EthDst,
    #[serde(rename = "ipv4.ttl")]
    Ipv4Ttl,
    #[serde(rename = "ipv4.ident")]
    Ipv4Ident,
    #[serde(rename = "ipv4.checksum")]
    Ipv4Checksum,
    #[serde(rename = "icmp.checksum")]
    IcmpChecksum,
    #[serde(rename = "udp.checksum")]
    UdpChecksum,
}

impl Wildcard {
    pub const ALL: [Wildcard; 7] = [
        Wildcard::EthSrc,
        Wildcard::EthDst,
        Wildcard::Ipv4Ttl,
        Wildcard::Ipv4Ident,
        Wildcard::Ipv4Checksum,
        Wildcard::IcmpChecksum,
        Wildcard::UdpChecksum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Wildcard::EthSrc => "eth.src",
            Wildcard::EthDst => "eth.dst",
            Wildcard::Ipv4Ttl => "ipv4.ttl",
            Wildcard::Ipv4Ident => "ipv4.ident",
            Wildcard::Ipv4Checksum => "ipv4.checksum",
            Wildcard::IcmpChecksum => "icmp.checksum",
            Wildcard::UdpChecksum => "udp.checksum",
        }
    }

    /// Byte range of the field inside `frame`, if the frame carries the
    /// header it belongs to.
    pub fn byte_range(&self, frame: &Frame<'_>) -> Option<Range<usize>> {
        let at = |kind: HeaderKind, offset: usize, len: usize| {
            frame
                .offset_of(kind)
                .map(|start| start + offset..start + offset + len)
        };
        match self {
            Wildcard::EthDst => at(HeaderKind::Ethernet, 0, 6),
            Wildcard::EthSrc => at(HeaderKind::Ethernet, 6, 6),
            Wildcard::Ipv4Ttl => at(HeaderKind::Ipv4, ipv4::TTL_OFFSET, 1),
            Wildcard::Ipv4Ident => at(HeaderKind::Ipv4, ipv4::IDENT_OFFSET, 2),
            Wildcard::Ipv4Checksum => at(HeaderKind::Ipv4, ipv4::CHECKSUM_OFFSET, 2),
            Wildcard::IcmpChecksum => at(HeaderKind::Icmp, icmp::CHECKSUM_OFFSET, 2),
            Wildcard::UdpChecksum => at(HeaderKind::Udp, udp::CHECKSUM_OFFSET, 2),
        }
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Wildcard {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Wildcard::ALL
            .into_iter()
            .find(|w| w.name() == s.trim())
            .ok_or_else(|| ScenarioError::InvalidPredicate {
                expr: s.to_string(),
                reason: "not a maskable field".into(),
            })
    }
}
