//! ## vaktprov-core::matching
//! **Strictly ordered matching of shim calls against the script**
//!
//! Only the event under the cursor can be satisfied. Every call either
//! resolves that event (passed or failed, after which the cursor moves on)
//! or is recorded as an anomaly that leaves the cursor where it is. Nothing
//! here returns an error: a misbehaving implementation produces verdicts,
//! never aborts the run.

use std::time::Duration;

use tracing::{debug, warn};

use crate::event::{EventKind, ExpectedEvent};
use crate::packet::Packet;
use crate::result::{
    Anomaly, Delivery, EventResult, FailureKind, Outcome, ReceiveOutcome, Resolution, Termination,
};
use crate::scenario::Scenario;

impl Scenario {
    /// Called when the implementation asks for a packet, optionally from a
    /// single interface and with its own timeout.
    pub fn on_receive_attempt(
        &mut self,
        interface: Option<&str>,
        timeout: Option<Duration>,
    ) -> ReceiveOutcome {
        self.progress.calls += 1;
        let Some(event) = self.next_expected().cloned() else {
            debug!(scenario = %self.name(), "recv_packet after script exhausted");
            return ReceiveOutcome::NoPackets(self.anomaly(
                FailureKind::UnexpectedExtraCall,
                "recv_packet called, but no more events expected".to_string(),
            ));
        };
        let index = self.progress.cursor;
        debug!(index, event = %event.summary(), ?interface, ?timeout, "recv_packet");

        match event.kind {
            EventKind::Input {
                interface: expected,
                packet,
            } => match interface {
                Some(wanted) if wanted != expected => {
                    ReceiveOutcome::NoPackets(self.fail(
                        index,
                        &event.description,
                        FailureKind::DeviceMismatch,
                        format!(
                            "recv_packet called on device {wanted}, but the next packet arrives on {expected}"
                        ),
                    ))
                }
                _ => {
                    self.pass(index, &event.description);
                    ReceiveOutcome::Delivered(Delivery {
                        timestamp: self.elapsed(),
                        interface: expected,
                        packet,
                    })
                }
            },
            EventKind::Timeout { duration } => {
                let wait = match (duration, timeout) {
                    (Some(scripted), Some(caller)) => scripted.min(caller),
                    (Some(d), None) | (None, Some(d)) => d,
                    (None, None) => Duration::ZERO,
                };
                self.progress.clock.advance_by(wait);
                ReceiveOutcome::NoPackets(self.pass(index, &event.description))
            }
            EventKind::Output { .. } => ReceiveOutcome::NoPackets(self.fail(
                index,
                &event.description,
                FailureKind::OrderViolation,
                "recv_packet called, but I was expecting send_packet".to_string(),
            )),
        }
    }

    /// Called when the implementation emits `packet` on `interface`.
    pub fn on_send_attempt(&mut self, interface: &str, packet: &Packet) -> Resolution {
        self.progress.calls += 1;
        let Some(event) = self.next_expected().cloned() else {
            return self.anomaly(
                FailureKind::UnexpectedExtraCall,
                format!(
                    "output on device {interface} unexpected, no more events expected ({})",
                    packet.summary(None)
                ),
            );
        };
        let index = self.progress.cursor;
        debug!(index, event = %event.summary(), interface, packet = ?packet, "send_packet");

        if !event.is_output() {
            return self.anomaly(
                FailureKind::OrderViolation,
                format!(
                    "send_packet called, but I was expecting {} ({}); got output on device {interface} ({})",
                    event.awaited_call(),
                    event.description,
                    packet.summary(None)
                ),
            );
        }

        match check_output(&event, interface, packet) {
            Ok(()) => self.pass(index, &event.description),
            Err((kind, message)) => self.fail(index, &event.description, kind, message),
        }
    }

    /// Called when the implementation waited a full idle period without
    /// doing anything.
    pub fn on_timeout_elapsed(&mut self) -> Resolution {
        self.progress.calls += 1;
        match self.next_expected() {
            Some(ExpectedEvent {
                kind: EventKind::Timeout { duration },
                description,
                ..
            }) => {
                let description = description.clone();
                if let Some(wait) = *duration {
                    self.progress.clock.advance_by(wait);
                }
                self.pass(self.progress.cursor, &description)
            }
            Some(event) => {
                let message = format!(
                    "timed out waiting for your code, but I was expecting {} ({})",
                    event.awaited_call(),
                    event.description
                );
                self.anomaly(FailureKind::UnexpectedTimeout, message)
            }
            None => self.anomaly(
                FailureKind::UnexpectedTimeout,
                "timed out waiting for your code to return".to_string(),
            ),
        }
    }

    /// Closes the run. When the implementation stopped with events left and
    /// nothing failed yet, the event it stopped on is failed with a reason
    /// derived from `termination`. Repeated calls are ignored.
    pub fn finish(&mut self, termination: Termination) {
        if self.progress.termination.is_some() {
            return;
        }
        if !self.done() && !self.has_failures() {
            let index = self.progress.cursor;
            let description = self.events()[index].description.clone();
            let (kind, message) = termination.failure();
            self.fail(index, &description, kind, message);
        }
        debug!(
            scenario = %self.name(),
            ?termination,
            passed = self.passed_count(),
            failed = self.failed_count(),
            pending = self.pending_count(),
            "scenario finished"
        );
        self.progress.termination = Some(termination);
    }

    fn pass(&mut self, index: usize, description: &str) -> Resolution {
        self.record(index, description, Outcome::Passed, None, None);
        Resolution::Passed { index }
    }

    fn fail(
        &mut self,
        index: usize,
        description: &str,
        kind: FailureKind,
        message: String,
    ) -> Resolution {
        warn!(index, %kind, %message, "event failed");
        self.record(index, description, Outcome::Failed, Some(kind), Some(message));
        Resolution::Failed { index, kind }
    }

    fn record(
        &mut self,
        index: usize,
        description: &str,
        outcome: Outcome,
        failure: Option<FailureKind>,
        message: Option<String>,
    ) {
        let at = self.elapsed();
        self.progress.completed.push(EventResult {
            index,
            description: description.to_string(),
            outcome,
            failure,
            message,
            at,
        });
        self.progress.cursor = index + 1;
    }

    fn anomaly(&mut self, kind: FailureKind, message: String) -> Resolution {
        let cursor = self.progress.cursor;
        if let Some(last) = self.progress.anomalies.last_mut() {
            if last.kind == kind && last.cursor == cursor && last.message == message {
                last.repeats += 1;
                return Resolution::Anomaly(kind);
            }
        }
        warn!(cursor, %kind, %message, "anomaly");
        let at = self.elapsed();
        self.progress.anomalies.push(Anomaly {
            kind,
            message,
            cursor,
            at,
            repeats: 1,
        });
        Resolution::Anomaly(kind)
    }
}

fn check_output(
    event: &ExpectedEvent,
    interface: &str,
    observed: &Packet,
) -> Result<(), (FailureKind, String)> {
    let EventKind::Output {
        interface: expected_interface,
        packet: expected,
        exact,
        predicates,
        wildcards,
    } = &event.kind
    else {
        return Ok(());
    };

    if interface != expected_interface {
        return Err((
            FailureKind::DeviceMismatch,
            format!("output on device {interface} unexpected (I expected this on {expected_interface})"),
        ));
    }

    if *exact {
        return match expected.first_difference(observed, wildcards) {
            None => Ok(()),
            Some(diff) => Err((
                FailureKind::ExactMatchFailed,
                format!(
                    "an exact match failed: {diff}. Expected {}, got {}",
                    expected.summary(event.display),
                    observed.summary(event.display)
                ),
            )),
        };
    }

    if predicates.is_empty() {
        let want = expected.frame().layers();
        let got = observed.frame().layers();
        if want != got {
            return Err((
                FailureKind::PredicateMatchFailed,
                format!("expected headers {want:?}, got {got:?} ({})", observed.summary(None)),
            ));
        }
        return Ok(());
    }

    match predicates.iter().find(|p| !p.evaluate(observed)) {
        None => Ok(()),
        Some(failed) => Err((
            FailureKind::PredicateMatchFailed,
            format!(
                "predicate `{}` did not hold for {}",
                failed.name(),
                observed.summary(event.display)
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use crate::wildcard::Wildcard;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;
    use vaktprov_protocols::{arp, ethernet, ArpPacket, HeaderKind, MacAddr};

    fn mac(last: u8) -> MacAddr {
        MacAddr::new([0x30, 0, 0, 0, 0, last])
    }

    fn arp_frame(operation: u16, sender: u8, target_ip: [u8; 4]) -> Packet {
        let mut raw = Vec::new();
        let dst = if operation == arp::OP_REQUEST {
            MacAddr::BROADCAST
        } else {
            mac(1)
        };
        ethernet::write_header(&mut raw, dst, mac(sender), ethernet::ETHERTYPE_ARP);
        ArpPacket {
            operation,
            sender_hw: mac(sender),
            sender_proto: Ipv4Addr::new(10, 0, 0, sender),
            target_hw: dst,
            target_proto: target_ip.into(),
        }
        .write_to(&mut raw);
        Packet::from(raw)
    }

    /// Input, Output, Timeout(3s), Output across four interfaces.
    fn arp_scenario() -> Scenario {
        let mut s = Scenario::new("arp");
        for i in 0..4u8 {
            s.add_interface(
                format!("router-eth{i}"),
                mac(10 + i),
                Ipv4Addr::new(10, 0, i, 1),
                Ipv4Addr::new(255, 255, 255, 0),
            )
            .unwrap();
        }
        let request = arp_frame(arp::OP_REQUEST, 2, [10, 0, 0, 1]);
        let reply = arp_frame(arp::OP_REPLY, 10, [10, 0, 0, 2]);
        s.expect(
            ExpectedEvent::input("router-eth0", request, "ARP request arrives")
                .display(HeaderKind::Arp),
        )
        .unwrap();
        s.expect(ExpectedEvent::output("router-eth0", reply.clone(), "ARP reply sent"))
            .unwrap();
        s.expect(ExpectedEvent::timeout(Some(Duration::from_secs(3)), "nothing happens"))
            .unwrap();
        s.expect(ExpectedEvent::output("router-eth0", reply, "ARP reply sent again"))
            .unwrap();
        s
    }

    fn reply() -> Packet {
        arp_frame(arp::OP_REPLY, 10, [10, 0, 0, 2])
    }

    #[test]
    fn test_happy_path() {
        let mut s = arp_scenario();
        assert!(matches!(
            s.on_receive_attempt(None, Some(Duration::from_secs(1))),
            ReceiveOutcome::Delivered(Delivery { ref interface, .. }) if interface == "router-eth0"
        ));
        assert!(s.on_send_attempt("router-eth0", &reply()).is_passed());
        assert_eq!(
            s.on_receive_attempt(None, Some(Duration::from_secs(1))),
            ReceiveOutcome::NoPackets(Resolution::Passed { index: 2 })
        );
        assert_eq!(s.elapsed(), Duration::from_secs(1));
        assert!(s.on_send_attempt("router-eth0", &reply()).is_passed());
        s.finish(Termination::Returned);
        assert_eq!((s.passed_count(), s.failed_count(), s.pending_count()), (4, 0, 0));
        assert!(s.anomalies().is_empty());
        assert_eq!(s.calls(), 4);
    }

    #[test]
    fn test_timeout_without_caller_limit_uses_scripted_duration() {
        let mut s = arp_scenario();
        s.on_receive_attempt(None, None);
        s.on_send_attempt("router-eth0", &reply());
        s.on_receive_attempt(None, None);
        assert_eq!(s.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_device_mismatch_on_send() {
        let mut s = arp_scenario();
        s.on_receive_attempt(None, None);
        let r = s.on_send_attempt("router-eth1", &reply());
        assert_eq!(
            r,
            Resolution::Failed {
                index: 1,
                kind: FailureKind::DeviceMismatch
            }
        );
        let message = s.completed()[1].message.clone().unwrap();
        assert!(message.contains("output on device router-eth1 unexpected"));
        s.finish(Termination::Returned);
        assert_eq!((s.passed_count(), s.failed_count(), s.pending_count()), (1, 1, 2));
    }

    #[test]
    fn test_device_mismatch_on_filtered_receive() {
        let mut s = arp_scenario();
        let r = s.on_receive_attempt(Some("router-eth3"), None);
        assert_eq!(
            r,
            ReceiveOutcome::NoPackets(Resolution::Failed {
                index: 0,
                kind: FailureKind::DeviceMismatch
            })
        );
        assert_eq!(s.cursor(), 1);
    }

    #[test]
    fn test_receive_while_output_expected() {
        let mut s = arp_scenario();
        s.on_receive_attempt(None, None);
        let r = s.on_receive_attempt(None, None);
        assert_eq!(
            r,
            ReceiveOutcome::NoPackets(Resolution::Failed {
                index: 1,
                kind: FailureKind::OrderViolation
            })
        );
        assert_eq!(
            s.completed()[1].message.as_deref(),
            Some("recv_packet called, but I was expecting send_packet")
        );
        s.finish(Termination::Returned);
        assert_eq!((s.passed_count(), s.failed_count(), s.pending_count()), (1, 1, 2));
    }

    #[test]
    fn test_send_while_input_expected_is_anomaly() {
        let mut s = arp_scenario();
        let r = s.on_send_attempt("router-eth0", &reply());
        assert_eq!(r, Resolution::Anomaly(FailureKind::OrderViolation));
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.anomalies().len(), 1);
    }

    #[test]
    fn test_exact_mismatch_reports_offset() {
        let mut s = arp_scenario();
        s.on_receive_attempt(None, None);
        let wrong = arp_frame(arp::OP_REPLY, 10, [10, 0, 0, 9]);
        let r = s.on_send_attempt("router-eth0", &wrong);
        assert_eq!(
            r,
            Resolution::Failed {
                index: 1,
                kind: FailureKind::ExactMatchFailed
            }
        );
        let message = s.completed()[1].message.clone().unwrap();
        assert!(message.starts_with("an exact match failed: byte 41"), "{message}");
        assert!(message.contains("ARP header"));
    }

    #[test]
    fn test_wildcards_relax_exact_match() {
        let mut s = Scenario::new("wild");
        s.add_interface("eth0", mac(1), Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 0, 0, 0))
            .unwrap();
        s.expect(
            ExpectedEvent::output("eth0", reply(), "any source")
                .with_wildcard(Wildcard::EthSrc),
        )
        .unwrap();
        let mut raw = reply().bytes().to_vec();
        raw[6..12].copy_from_slice(&[0xaa; 6]);
        assert!(s.on_send_attempt("eth0", &Packet::from(raw)).is_passed());
    }

    fn ipv4_frame(src: MacAddr, ttl: u8) -> Packet {
        let mut raw = Vec::new();
        ethernet::write_header(&mut raw, mac(1), src, ethernet::ETHERTYPE_IPV4);
        raw.extend_from_slice(&[0x45, 0, 0, 28, 0, 0, 0, 0, ttl, 17, 0, 0]);
        raw.extend_from_slice(&[10, 0, 0, 2, 10, 0, 0, 1]);
        raw.extend_from_slice(&[0x30, 0x39, 0x00, 0x35, 0, 8, 0, 0]);
        Packet::from(raw)
    }

    #[test]
    fn test_ttl_threshold_ignores_other_fields() {
        let mut s = Scenario::new("ttl");
        s.add_interface("eth0", mac(1), Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 0, 0, 0))
            .unwrap();
        let template = ipv4_frame(mac(50), 64);
        for description in ["first datagram", "second datagram"] {
            s.expect(
                ExpectedEvent::output("eth0", template.clone(), description)
                    .inexact()
                    .with_predicate(Predicate::field("ipv4.ttl >= 8").unwrap()),
            )
            .unwrap();
        }

        assert_eq!(
            s.on_send_attempt("eth0", &ipv4_frame(mac(99), 9)),
            Resolution::Passed { index: 0 }
        );
        assert_eq!(
            s.on_send_attempt("eth0", &ipv4_frame(mac(50), 7)),
            Resolution::Failed {
                index: 1,
                kind: FailureKind::PredicateMatchFailed
            }
        );
        assert!(s.completed()[1]
            .message
            .as_deref()
            .unwrap()
            .contains("`ipv4.ttl >= 8`"));
    }

    #[test]
    fn test_predicates_and_first_failure() {
        let mut s = Scenario::new("inexact");
        s.add_interface("eth0", mac(1), Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 0, 0, 0))
            .unwrap();
        let event = ExpectedEvent::output("eth0", reply(), "some reply")
            .inexact()
            .with_predicate(Predicate::field("arp.op == 2").unwrap())
            .with_predicate(Predicate::custom("always_false", |_| false))
            .with_predicate(Predicate::field("arp.op == 9").unwrap());
        s.expect(event).unwrap();
        s.expect(
            ExpectedEvent::output("eth0", reply(), "a reply")
                .inexact()
                .with_predicate(Predicate::field("arp.op == 2").unwrap()),
        )
        .unwrap();
        assert_eq!(
            s.on_send_attempt("eth0", &reply()),
            Resolution::Failed {
                index: 0,
                kind: FailureKind::PredicateMatchFailed
            }
        );
        assert!(s.completed()[0]
            .message
            .as_deref()
            .unwrap()
            .contains("`always_false`"));
        assert!(s.on_send_attempt("eth0", &arp_frame(arp::OP_REPLY, 3, [1, 2, 3, 4])).is_passed());
    }

    #[test]
    fn test_inexact_without_predicates_compares_layers() {
        let mut s = Scenario::new("layers");
        s.add_interface("eth0", mac(1), Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 0, 0, 0))
            .unwrap();
        s.expect(ExpectedEvent::output("eth0", reply(), "any arp").inexact())
            .unwrap();
        s.expect(ExpectedEvent::output("eth0", reply(), "any arp").inexact())
            .unwrap();
        assert!(s
            .on_send_attempt("eth0", &arp_frame(arp::OP_REQUEST, 7, [1, 1, 1, 1]))
            .is_passed());
        assert!(!s.on_send_attempt("eth0", &Packet::from(vec![0u8; 20])).is_passed());
    }

    #[test]
    fn test_extra_calls_are_anomalies() {
        let mut s = arp_scenario();
        s.on_receive_attempt(None, None);
        s.on_send_attempt("router-eth0", &reply());
        s.on_receive_attempt(None, None);
        s.on_send_attempt("router-eth0", &reply());
        assert!(s.done());
        assert_eq!(
            s.on_send_attempt("router-eth0", &reply()),
            Resolution::Anomaly(FailureKind::UnexpectedExtraCall)
        );
        assert_eq!(
            s.on_receive_attempt(None, None),
            ReceiveOutcome::NoPackets(Resolution::Anomaly(FailureKind::UnexpectedExtraCall))
        );
        s.finish(Termination::Returned);
        assert_eq!((s.passed_count(), s.failed_count(), s.pending_count()), (4, 0, 0));
        assert_eq!(s.anomalies().len(), 2);
    }

    #[test]
    fn test_repeated_anomalies_are_folded() {
        let mut s = arp_scenario();
        s.on_receive_attempt(None, None);
        s.on_send_attempt("router-eth0", &reply());
        s.on_receive_attempt(None, None);
        s.on_send_attempt("router-eth0", &reply());
        for _ in 0..1000 {
            assert_eq!(
                s.on_receive_attempt(None, None),
                ReceiveOutcome::NoPackets(Resolution::Anomaly(FailureKind::UnexpectedExtraCall))
            );
        }
        assert_eq!(s.anomalies().len(), 1);
        assert_eq!(s.anomalies()[0].repeats, 1000);

        // A different call breaks the run of repeats.
        s.on_send_attempt("router-eth0", &reply());
        s.on_receive_attempt(None, None);
        assert_eq!(s.anomalies().len(), 3);
        assert_eq!(
            s.anomalies().iter().map(|a| a.repeats).collect::<Vec<_>>(),
            vec![1000, 1, 1]
        );
    }

    #[test]
    fn test_timeout_elapsed() {
        let mut s = arp_scenario();
        assert_eq!(
            s.on_timeout_elapsed(),
            Resolution::Anomaly(FailureKind::UnexpectedTimeout)
        );
        assert_eq!(s.cursor(), 0);
        s.on_receive_attempt(None, None);
        s.on_send_attempt("router-eth0", &reply());
        assert_eq!(s.on_timeout_elapsed(), Resolution::Passed { index: 2 });
        assert_eq!(s.elapsed(), Duration::from_secs(3));
        assert_eq!(s.completed()[2].at, Duration::from_secs(3));
    }

    #[test]
    fn test_finish_marks_only_current_event() {
        let mut s = arp_scenario();
        s.finish(Termination::Crashed("boom".into()));
        assert_eq!((s.passed_count(), s.failed_count(), s.pending_count()), (0, 1, 3));
        assert_eq!(s.completed()[0].failure, Some(FailureKind::ImplementationCrash));
        s.finish(Termination::Returned);
        assert_eq!(s.completed().len(), 1);
        assert!(s.termination().unwrap().is_crash());
    }

    #[test]
    fn test_reset_allows_replay() {
        let mut s = arp_scenario();
        s.on_receive_attempt(None, None);
        s.finish(Termination::Returned);
        s.reset();
        assert_eq!(s.cursor(), 0);
        assert!(s.completed().is_empty());
        assert!(s.termination().is_none());
        assert_eq!(s.elapsed(), Duration::ZERO);
    }

    #[derive(Debug, Clone)]
    enum Call {
        Recv(Option<u8>),
        Send(u8, bool),
        Idle,
    }

    fn call() -> impl Strategy<Value = Call> {
        prop_oneof![
            proptest::option::of(0..4u8).prop_map(Call::Recv),
            (0..4u8, any::<bool>()).prop_map(|(i, ok)| Call::Send(i, ok)),
            Just(Call::Idle),
        ]
    }

    proptest! {
        #[test]
        fn prop_counts_cover_every_event(calls in proptest::collection::vec(call(), 0..12), crash in any::<bool>()) {
            let mut s = arp_scenario();
            for c in calls {
                match c {
                    Call::Recv(iface) => {
                        let name = iface.map(|i| format!("router-eth{i}"));
                        s.on_receive_attempt(name.as_deref(), None);
                    }
                    Call::Send(i, ok) => {
                        let packet = if ok { reply() } else { arp_frame(arp::OP_REPLY, 5, [0; 4]) };
                        s.on_send_attempt(&format!("router-eth{i}"), &packet);
                    }
                    Call::Idle => {
                        s.on_timeout_elapsed();
                    }
                }
            }
            s.finish(if crash { Termination::Crashed("x".into()) } else { Termination::Returned });

            prop_assert_eq!(s.passed_count() + s.failed_count() + s.pending_count(), s.len());
            let indices: Vec<usize> = s.completed().iter().map(|r| r.index).collect();
            let expected: Vec<usize> = (0..s.completed().len()).collect();
            prop_assert_eq!(indices, expected);
            prop_assert_eq!(s.pending().len(), s.pending_count());
        }
    }
}
