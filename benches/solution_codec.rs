//! Performance benchmarks for solution packing and header hashing

use criterion::{criterion_group, criterion_main, Criterion};
use equihash_genesis::codec::SolutionCodec;
use equihash_genesis::{BlockHeader, ChainParams, EquihashHeader, EquihashParams, Network, Nonce};
use std::hint::black_box;

fn bench_solution_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("solution_codec");

    let codec = SolutionCodec::new(EquihashParams::MAINNET);
    let indices: Vec<u32> = (0..512u32).map(|i| (i * 4099) % (1 << 21)).collect();
    let packed = codec.pack(&indices).unwrap();

    group.bench_function("pack_mainnet", |b| {
        b.iter(|| black_box(codec.pack(black_box(&indices)).unwrap()));
    });

    group.bench_function("unpack_mainnet", |b| {
        b.iter(|| black_box(codec.unpack(black_box(&packed)).unwrap()));
    });

    group.finish();
}

fn bench_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("header");

    let params = ChainParams::for_network(Network::Mainnet);
    let header = EquihashHeader::new([0x42; 32], 1_477_641_360, 0x1f07ffff, Nonce::zero());
    let block = BlockHeader::new(header.clone(), vec![0x5a; 1344], &params).unwrap();
    let serialized = block.serialize();

    group.bench_function("pow_hash", |b| {
        b.iter(|| black_box(black_box(&header).pow_hash()));
    });

    group.bench_function("deserialize_block_header", |b| {
        b.iter(|| black_box(BlockHeader::deserialize(black_box(&serialized), &params).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_solution_codec, bench_header);
criterion_main!(benches);
