//! ## vaktprov-protocols::frame
//! Best-effort decoding of a whole Ethernet frame into its header stack.
//!
//! Decoding never fails: it stops at the first layer that does not parse, so
//! a truncated or unusual frame still yields the layers that were readable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arp::{ArpPacket, ArpParser};
use crate::ethernet::{self, EthernetFrame, EthernetParser};
use crate::icmp::{IcmpPacket, IcmpParser};
use crate::ipv4::{self, Ipv4Packet, Ipv4Parser};
use crate::udp::{UdpDatagram, UdpParser};

/// Header layers understood by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderKind {
    Ethernet,
    Arp,
    Ipv4,
    Icmp,
    Udp,
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeaderKind::Ethernet => "Ethernet",
            HeaderKind::Arp => "ARP",
            HeaderKind::Ipv4 => "IPv4",
            HeaderKind::Icmp => "ICMP",
            HeaderKind::Udp => "UDP",
        };
        f.write_str(name)
    }
}

/// Decoded header stack of one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frame<'a> {
    pub ethernet: Option<EthernetFrame<'a>>,
    pub arp: Option<ArpPacket>,
    pub ipv4: Option<Ipv4Packet<'a>>,
    pub icmp: Option<IcmpPacket<'a>>,
    pub udp: Option<UdpDatagram<'a>>,
    len: usize,
}

impl<'a> Frame<'a> {
    pub fn decode(data: &'a [u8]) -> Self {
        let mut frame = Frame {
            len: data.len(),
            ..Frame::default()
        };
        let Ok(eth) = EthernetParser::new().parse(data) else {
            return frame;
        };
        frame.ethernet = Some(eth);

        match eth.ethertype {
            ethernet::ETHERTYPE_ARP => frame.arp = ArpParser::new().parse(eth.payload).ok(),
            ethernet::ETHERTYPE_IPV4 => {
                if let Ok(ip) = Ipv4Parser::new().parse(eth.payload) {
                    frame.ipv4 = Some(ip);
                    match ip.protocol {
                        ipv4::PROTO_ICMP => frame.icmp = IcmpParser::new().parse(ip.payload).ok(),
                        ipv4::PROTO_UDP => frame.udp = UdpParser::new().parse(ip.payload).ok(),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        frame
    }

    /// Layers present, outermost first.
    pub fn layers(&self) -> Vec<HeaderKind> {
        let mut layers = Vec::with_capacity(3);
        if self.ethernet.is_some() {
            layers.push(HeaderKind::Ethernet);
        }
        if self.arp.is_some() {
            layers.push(HeaderKind::Arp);
        }
        if self.ipv4.is_some() {
            layers.push(HeaderKind::Ipv4);
        }
        if self.icmp.is_some() {
            layers.push(HeaderKind::Icmp);
        }
        if self.udp.is_some() {
            layers.push(HeaderKind::Udp);
        }
        layers
    }

    pub fn has(&self, kind: HeaderKind) -> bool {
        match kind {
            HeaderKind::Ethernet => self.ethernet.is_some(),
            HeaderKind::Arp => self.arp.is_some(),
            HeaderKind::Ipv4 => self.ipv4.is_some(),
            HeaderKind::Icmp => self.icmp.is_some(),
            HeaderKind::Udp => self.udp.is_some(),
        }
    }

    /// Byte offset at which the given header starts within the frame.
    pub fn offset_of(&self, kind: HeaderKind) -> Option<usize> {
        if !self.has(kind) {
            return None;
        }
        match kind {
            HeaderKind::Ethernet => Some(0),
            HeaderKind::Arp | HeaderKind::Ipv4 => Some(ethernet::HEADER_LEN),
            HeaderKind::Icmp | HeaderKind::Udp => self
                .ipv4
                .map(|ip| ethernet::HEADER_LEN + ip.header_len),
        }
    }

    /// Innermost decoded layer whose header range contains `offset`.
    pub fn layer_at(&self, offset: usize) -> Option<HeaderKind> {
        self.layers()
            .into_iter()
            .rev()
            .find(|kind| self.offset_of(*kind).is_some_and(|start| offset >= start))
    }

    /// One-line description of the frame. With `focus`, only that layer is
    /// described (falling back to the whole stack when it is absent).
    pub fn summarize(&self, focus: Option<HeaderKind>) -> String {
        if let Some(kind) = focus.filter(|kind| self.has(*kind)) {
            return self.describe(kind);
        }
        let layers = self.layers();
        if layers.is_empty() {
            return format!("{} raw bytes", self.len);
        }
        layers
            .into_iter()
            .map(|kind| self.describe(kind))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn describe(&self, kind: HeaderKind) -> String {
        match kind {
            HeaderKind::Ethernet => self
                .ethernet
                .map(|eth| format!("Ethernet {}->{} 0x{:04x}", eth.src, eth.dst, eth.ethertype)),
            HeaderKind::Arp => self.arp.map(|arp| {
                if arp.is_request() {
                    format!(
                        "ARP request who-has {} tell {} ({})",
                        arp.target_proto, arp.sender_proto, arp.sender_hw
                    )
                } else {
                    format!("ARP reply {} is-at {}", arp.sender_proto, arp.sender_hw)
                }
            }),
            HeaderKind::Ipv4 => self.ipv4.map(|ip| {
                format!(
                    "IPv4 {}->{} proto {} ttl {} len {}",
                    ip.src, ip.dst, ip.protocol, ip.ttl, ip.total_len
                )
            }),
            HeaderKind::Icmp => self.icmp.map(|icmp| {
                format!(
                    "ICMP {} code {} ({} data bytes: {})",
                    icmp.type_name(),
                    icmp.code,
                    icmp.data.len(),
                    hex::encode(&icmp.data[..icmp.data.len().min(8)])
                )
            }),
            HeaderKind::Udp => self.udp.map(|udp| {
                format!(
                    "UDP {}->{} ({} payload bytes)",
                    udp.src_port,
                    udp.dst_port,
                    udp.payload.len()
                )
            }),
        }
        .unwrap_or_default()
    }
}
