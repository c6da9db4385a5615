#![allow(missing_docs)]

//! Encode/decode throughput of map-notify messages with growing locator sets.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lisp_proto::{
    address::EidPrefix,
    control::MapNotify,
    locator::Rloc,
    mapping::{MappingEntry, MappingOrigin},
    record::MappingRecord,
    wire_encoding::{WireDecode, WireEncode},
};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

fn message_with_locators(rng: &mut XorShiftRng, locators: usize) -> MapNotify {
    let prefix = EidPrefix::containing("10.1.2.0".parse().unwrap(), 24).unwrap();
    let mut entry = MappingEntry::new(prefix, MappingOrigin::Database);
    for _ in 0..locators {
        let address = std::net::Ipv4Addr::from(rng.gen::<u32>());
        entry.add_locator(Rloc::new(address.into(), rng.gen(), rng.gen()));
    }

    MapNotify::new(rng.gen(), 0, vec![MappingRecord::from_entry(&entry)])
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("MapNotify");
    let mut rng = XorShiftRng::seed_from_u64(47);

    for locators in [1, 4, 16, 64] {
        let message = message_with_locators(&mut rng, locators);
        let encoded = message.encode_to_bytes();

        group.bench_with_input(
            BenchmarkId::new("encode", locators),
            &message,
            |b, message| b.iter(|| message.encode_to_bytes()),
        );
        group.bench_with_input(
            BenchmarkId::new("decode", locators),
            encoded.as_ref(),
            |b, data| b.iter(|| MapNotify::decode(&mut &data[..]).unwrap()),
        );
    }

    group.finish()
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
