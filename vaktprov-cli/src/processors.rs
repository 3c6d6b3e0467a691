//! Reference packet processors bundled with the CLI, and the custom
//! predicates their scenarios refer to by name.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use vaktprov_core::{Interface, Packet, PredicateRegistry};
use vaktprov_engine::{PacketProcessor, RecvError, Shim};
use vaktprov_protocols::{arp, ethernet, ArpPacket, MacAddr};

const POLL: Duration = Duration::from_secs(1);

pub fn all() -> Vec<Arc<dyn PacketProcessor>> {
    vec![Arc::new(Silent), Arc::new(Hub), Arc::new(ArpResponder)]
}

pub fn by_name(name: &str) -> Option<Arc<dyn PacketProcessor>> {
    all().into_iter().find(|p| p.name() == name)
}

pub fn describe(name: &str) -> &'static str {
    match name {
        "silent" => "returns immediately without touching the network",
        "hub" => "floods every received frame out of all other interfaces",
        "arp-responder" => "answers ARP requests for its own interface addresses",
        _ => "",
    }
}

/// Custom predicates available to scenarios run from the command line.
pub fn predicates() -> PredicateRegistry {
    let mut registry = PredicateRegistry::new();
    registry
        .register("is_arp_request", |p: &Packet| {
            p.frame().arp.is_some_and(|a| a.is_request())
        })
        .register("is_arp_reply", |p: &Packet| {
            p.frame().arp.is_some_and(|a| a.is_reply())
        })
        .register("is_broadcast", |p: &Packet| {
            p.frame()
                .ethernet
                .is_some_and(|eth| eth.dst == MacAddr::BROADCAST)
        });
    registry
}

struct Silent;

#[async_trait]
impl PacketProcessor for Silent {
    fn name(&self) -> &str {
        "silent"
    }

    async fn run(&self, _shim: Shim) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Hub;

#[async_trait]
impl PacketProcessor for Hub {
    fn name(&self) -> &str {
        "hub"
    }

    async fn run(&self, shim: Shim) -> anyhow::Result<()> {
        let interfaces = shim.interfaces();
        loop {
            let received = match shim.recv_packet(Some(POLL)).await {
                Ok(received) => received,
                Err(RecvError::NoPackets) => continue,
                Err(RecvError::Shutdown) => return Ok(()),
            };
            for out in interfaces.iter().filter(|i| i.name != received.interface) {
                shim.send_packet(&out.name, received.packet.clone());
            }
        }
    }
}

struct ArpResponder;

impl ArpResponder {
    /// Reply to `request` if it asks for the address of the interface it
    /// arrived on.
    fn reply(iface: &Interface, request: &ArpPacket) -> Option<Vec<u8>> {
        if !request.is_request() || request.target_proto != iface.ip {
            return None;
        }
        let mut frame = Vec::with_capacity(ethernet::HEADER_LEN + arp::ARP_LEN);
        ethernet::write_header(&mut frame, request.sender_hw, iface.mac, ethernet::ETHERTYPE_ARP);
        ArpPacket {
            operation: arp::OP_REPLY,
            sender_hw: iface.mac,
            sender_proto: iface.ip,
            target_hw: request.sender_hw,
            target_proto: request.sender_proto,
        }
        .write_to(&mut frame);
        Some(frame)
    }
}

#[async_trait]
impl PacketProcessor for ArpResponder {
    fn name(&self) -> &str {
        "arp-responder"
    }

    async fn run(&self, shim: Shim) -> anyhow::Result<()> {
        loop {
            let received = match shim.recv_packet(Some(POLL)).await {
                Ok(received) => received,
                Err(RecvError::NoPackets) => continue,
                Err(RecvError::Shutdown) => return Ok(()),
            };
            let Some(iface) = shim.interface_by_name(&received.interface) else {
                continue;
            };
            let Some(request) = received.packet.frame().arp else {
                debug!(interface = %iface.name, "ignoring non-ARP frame");
                continue;
            };
            if let Some(reply) = Self::reply(&iface, &request) {
                shim.send_packet(&iface.name, reply);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    use vaktprov_config::HarnessConfig;
    use vaktprov_core::{ExpectedEvent, Predicate, Scenario};
    use vaktprov_engine::ScenarioRunner;

    fn mac(s: &str) -> MacAddr {
        s.parse().unwrap()
    }

    fn arp(op: u16, src: &str, dst: &str, sender: [u8; 4], target: [u8; 4]) -> Vec<u8> {
        let mut raw = Vec::new();
        ethernet::write_header(&mut raw, mac(dst), mac(src), ethernet::ETHERTYPE_ARP);
        ArpPacket {
            operation: op,
            sender_hw: mac(src),
            sender_proto: sender.into(),
            target_hw: if op == arp::OP_REQUEST { MacAddr::new([0; 6]) } else { mac(dst) },
            target_proto: target.into(),
        }
        .write_to(&mut raw);
        raw
    }

    fn router() -> Scenario {
        let mut s = Scenario::new("router");
        s.add_interface(
            "router-eth0",
            mac("40:00:00:00:00:00"),
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(255, 255, 255, 0),
        )
        .unwrap();
        s.add_interface(
            "router-eth1",
            mac("40:00:00:00:00:01"),
            Ipv4Addr::new(10, 1, 1, 2),
            Ipv4Addr::new(255, 255, 255, 0),
        )
        .unwrap();
        s
    }

    fn request_for(target: [u8; 4]) -> Vec<u8> {
        arp(
            arp::OP_REQUEST,
            "30:00:00:00:00:01",
            "ff:ff:ff:ff:ff:ff",
            [10, 1, 1, 1],
            target,
        )
    }

    #[test]
    fn test_lookup() {
        assert_eq!(all().len(), 3);
        assert!(by_name("arp-responder").is_some());
        assert!(by_name("router").is_none());
        assert!(!describe("hub").is_empty());
    }

    #[tokio::test]
    async fn test_arp_responder_answers_for_own_address() {
        let mut s = router();
        s.expect(ExpectedEvent::input("router-eth1", request_for([10, 1, 1, 2]), "ARP request"))
            .unwrap();
        s.expect(ExpectedEvent::output(
            "router-eth1",
            arp(
                arp::OP_REPLY,
                "40:00:00:00:00:01",
                "30:00:00:00:00:01",
                [10, 1, 1, 2],
                [10, 1, 1, 1],
            ),
            "ARP reply",
        ))
        .unwrap();
        s.expect(ExpectedEvent::input("router-eth1", request_for([10, 1, 1, 9]), "ARP request for another host"))
            .unwrap();
        s.expect(ExpectedEvent::timeout(Some(POLL), "request ignored"))
            .unwrap();

        let report = ScenarioRunner::new(HarnessConfig::default())
            .run_processor(s, by_name("arp-responder").unwrap())
            .await;
        assert!(report.all_passed, "{:#?}", report.lines);
    }

    #[tokio::test]
    async fn test_hub_floods_with_custom_predicate() {
        let registry = predicates();
        let mut s = router();
        s.expect(ExpectedEvent::input("router-eth0", request_for([10, 1, 1, 2]), "broadcast arrives"))
            .unwrap();
        s.expect(
            ExpectedEvent::output("router-eth1", request_for([0, 0, 0, 0]), "broadcast flooded")
                .inexact()
                .with_predicate(registry.resolve("is_broadcast").unwrap())
                .with_predicate(Predicate::field("arp.target_ip == 10.1.1.2").unwrap()),
        )
        .unwrap();

        let report = ScenarioRunner::new(HarnessConfig::default())
            .run_processor(s, by_name("hub").unwrap())
            .await;
        assert!(report.all_passed, "{:#?}", report.lines);
    }

    #[tokio::test]
    async fn test_silent_fails_first_event() {
        let mut s = router();
        s.expect(ExpectedEvent::input("router-eth0", request_for([192, 168, 1, 1]), "ARP request"))
            .unwrap();
        let report = ScenarioRunner::new(HarnessConfig::default())
            .run_processor(s, by_name("silent").unwrap())
            .await;
        assert_eq!(report.failed_count, 1);
        assert!(!report.crashed);
    }
}
