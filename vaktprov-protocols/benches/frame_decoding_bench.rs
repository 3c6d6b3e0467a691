#[macro_use]
extern crate criterion;

use bytes::Bytes;
use criterion::{black_box, Criterion};

use vaktprov_protocols::{ArpParser, Frame, HeaderKind};

// ARP request: who-has 10.1.1.2 tell 10.1.1.1
const ARP_FRAME: &[u8] = &[
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // Destination (broadcast)
    0x30, 0x00, 0x00, 0x00, 0x00, 0x01, // Source
    0x08, 0x06, // EtherType ARP
    0x00, 0x01, 0x08, 0x00, 0x06, 0x04, // Ethernet/IPv4, hlen 6, plen 4
    0x00, 0x01, // Request
    0x30, 0x00, 0x00, 0x00, 0x00, 0x01, 0x0a, 0x01, 0x01, 0x01, // Sender
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x0a, 0x01, 0x01, 0x02, // Target
];

// ICMP echo request 172.16.128.1 -> 172.16.42.1, ttl 10
const ICMP_FRAME: &[u8] = &[
    0x10, 0x00, 0x00, 0x00, 0x00, 0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x08, 0x00, // Ethernet
    0x45, 0x00, 0x00, 0x1e, 0x00, 0x00, 0x00, 0x00, 0x0a, 0x01, 0x00, 0x00, // IPv4
    0xac, 0x10, 0x80, 0x01, 0xac, 0x10, 0x2a, 0x01, // Addresses
    0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a, 0x68, 0x69, // ICMP echo "hi"
];

fn benchmark_arp_parsing(c: &mut Criterion) {
    let parser = ArpParser::new();
    let frame = Bytes::from_static(ARP_FRAME);

    c.bench_function("arp_parsing", |b| {
        b.iter(|| {
            black_box(parser.parse(&frame[14..])).unwrap();
        })
    });
}

fn benchmark_frame_decoding(c: &mut Criterion) {
    let frame = Bytes::from_static(ICMP_FRAME);

    c.bench_function("icmp_frame_decoding", |b| {
        b.iter(|| black_box(Frame::decode(&frame).layers()))
    });

    c.bench_function("icmp_frame_summary", |b| {
        b.iter(|| black_box(Frame::decode(&frame).summarize(Some(HeaderKind::Icmp))))
    });
}

criterion_group!(benches, benchmark_arp_parsing, benchmark_frame_decoding);
criterion_main!(benches);
