use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keyforge::{FeeRecipient, KeyGenerator, RandomKeyGenerator};

fn bench_keygen(c: &mut Criterion) {
    let mut group = c.benchmark_group("keygen");
    group.throughput(Throughput::Elements(1));
    group.bench_function("random_key", |b| {
        b.iter(|| black_box(RandomKeyGenerator.generate()));
    });
    group.finish();
}

fn bench_fee_recipient(c: &mut Criterion) {
    let mut group = c.benchmark_group("fee_recipient");
    group.throughput(Throughput::Elements(1));
    group.bench_function("valid", |b| {
        b.iter(|| {
            black_box(FeeRecipient::is_valid(black_box(
                "0x1234567890abcdef1234567890abcdef12345678",
            )))
        });
    });
    group.bench_function("invalid", |b| {
        b.iter(|| black_box(FeeRecipient::is_valid(black_box("invalid-address"))));
    });
    group.finish();
}

criterion_group!(benches, bench_keygen, bench_fee_recipient);
criterion_main!(benches);
