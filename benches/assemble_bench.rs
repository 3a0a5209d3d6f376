//! Benchmarks for message assembly
//!
//! Benchmarks:
//! - Wallet contract derivation (state-init hashing)
//! - Instruction planning with and without an admin leg
//! - Signing and serializing an external message per wallet generation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ton_transfer::cell::Address;
use ton_transfer::test_utils::sample_identity;
use ton_transfer::tx_builder::{AdminLeg, ExternalMessageAssembler, InstructionBuilder, TransferSpec};
use ton_transfer::types::{Network, WalletGeneration};
use ton_transfer::wallet::WalletFactory;

fn native_spec(memo: Option<&str>) -> TransferSpec {
    TransferSpec::Native {
        recipient: Address::new(0, [1; 32]),
        value: 1_000_000_000,
        bounce: true,
        memo: memo.map(str::to_string),
    }
}

fn bench_wallet_open(c: &mut Criterion) {
    let identity = sample_identity();
    let factory = WalletFactory::new(0);

    let mut group = c.benchmark_group("wallet_open");
    for generation in [WalletGeneration::V4R2, WalletGeneration::V5R1] {
        group.bench_with_input(BenchmarkId::from_parameter(generation), &generation, |b, g| {
            b.iter(|| {
                factory
                    .open(black_box(*g), identity.public_key(), Network::Mainnet)
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    let builder = InstructionBuilder::new(50_000_000, 1_000_000_000).with_query_id(1);
    let admin = AdminLeg {
        address: Address::new(0, [9; 32]),
        amount: 50_000_000,
        bounce: false,
    };

    c.bench_function("plan_native", |b| {
        b.iter(|| builder.build(black_box(&native_spec(None)), None).unwrap())
    });
    c.bench_function("plan_native_with_admin", |b| {
        b.iter(|| {
            builder
                .build(black_box(&native_spec(Some("order 1"))), Some(&admin))
                .unwrap()
        })
    });
}

fn bench_assemble(c: &mut Criterion) {
    let identity = sample_identity();
    let factory = WalletFactory::new(0);
    let assembler = ExternalMessageAssembler::new(60);
    let plan = InstructionBuilder::new(50_000_000, 1_000_000_000)
        .build(&native_spec(Some(&"x".repeat(200))), None)
        .unwrap();

    let mut group = c.benchmark_group("assemble");
    for generation in [WalletGeneration::V4R2, WalletGeneration::V5R1] {
        let contract = factory
            .open(generation, identity.public_key(), Network::Mainnet)
            .unwrap();
        for seqno in [0u32, 7] {
            group.bench_with_input(
                BenchmarkId::new(generation.to_string(), seqno),
                &seqno,
                |b, &seqno| {
                    b.iter(|| {
                        assembler
                            .assemble(&contract, &plan, &identity, black_box(seqno), 1_700_000_000)
                            .unwrap()
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_wallet_open, bench_plan, bench_assemble);
criterion_main!(benches);
