#[macro_use]
extern crate criterion;

use std::net::Ipv4Addr;

use criterion::{black_box, BatchSize, Criterion};

use vaktprov_core::{ExpectedEvent, MacAddr, Packet, Predicate, Scenario, Wildcard};

// ICMP echo request 172.16.128.1 -> 172.16.42.1, ttl 10
const ECHO: &str = "100000000001ffffffffffff0800\
                    4500001e000000000a010000ac108001ac102a01\
                    08000000 0000002a6869";

fn scenario(events: usize, exact: bool) -> Scenario {
    let mut s = Scenario::new("bench");
    s.add_interface(
        "eth0",
        MacAddr::new([0x10, 0, 0, 0, 0, 1]),
        Ipv4Addr::new(172, 16, 42, 2),
        Ipv4Addr::new(255, 255, 255, 0),
    )
    .unwrap();
    let packet = Packet::from_hex(ECHO).unwrap();
    for i in 0..events {
        let event = ExpectedEvent::output("eth0", packet.clone(), format!("echo {i}"));
        let event = if exact {
            event
                .with_wildcard(Wildcard::Ipv4Ttl)
                .with_wildcard(Wildcard::Ipv4Checksum)
        } else {
            event
                .inexact()
                .with_predicate(Predicate::field("ipv4.dst == 172.16.42.1").unwrap())
                .with_predicate(Predicate::field("icmp.data ^= \"hi\"").unwrap())
        };
        s.expect(event).unwrap();
    }
    s
}

fn bench_send_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_matching");
    let packet = Packet::from_hex(ECHO).unwrap();

    for events in [16, 256] {
        group.throughput(criterion::Throughput::Elements(events as u64));
        for (label, exact) in [("exact", true), ("predicates", false)] {
            group.bench_function(format!("{label}_{events}"), |b| {
                b.iter_batched(
                    || scenario(events, exact),
                    |mut s| {
                        for _ in 0..events {
                            black_box(s.on_send_attempt("eth0", &packet));
                        }
                        s
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_send_matching);
criterion_main!(benches);
