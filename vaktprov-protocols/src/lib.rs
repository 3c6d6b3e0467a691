//! # vaktprov Protocol Views
//!
//! Zero-copy header views for the frames a scenario scripts: Ethernet II,
//! ARP, IPv4, ICMP and UDP. The harness treats packets as opaque bytes and
//! only reaches into them through this crate (wildcard masks, field
//! predicates, report summaries).

pub mod arp;
pub mod ethernet;
pub mod frame;
pub mod icmp;
pub mod ipv4;
pub mod mac;
pub mod udp;

pub use arp::{ArpPacket, ArpParser};
pub use ethernet::{EthernetFrame, EthernetParser};
pub use frame::{Frame, HeaderKind};
pub use icmp::{IcmpPacket, IcmpParser};
pub use ipv4::{Ipv4Packet, Ipv4Parser};
pub use mac::MacAddr;
pub use udp::{UdpDatagram, UdpParser};
