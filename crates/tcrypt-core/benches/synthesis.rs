//! Offset derivation, synthesis and search throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tcrypt_core::{fixtures, offsets, Pattern, PatternMatcher, StreamSynthesizer};

fn bench_derive(c: &mut Criterion) {
    c.bench_function("derive_100_offsets", |b| {
        b.iter(|| black_box(offsets::derive(black_box(42), 100)));
    });
}

fn bench_synthesize(c: &mut Criterion) {
    let source = fixtures::source(1_000_000).unwrap();
    let a = offsets::derive(1, 100);
    let b = offsets::derive(2, 100);

    let mut group = c.benchmark_group("synthesize");
    group.sample_size(10);
    for length in [10_000usize, 100_000] {
        group.throughput(Throughput::Elements(length as u64));
        for threads in [1usize, 4] {
            let synth = StreamSynthesizer::new(&source, threads);
            group.bench_with_input(
                BenchmarkId::new(format!("threads_{threads}"), length),
                &length,
                |bench, &length| {
                    bench.iter(|| black_box(synth.synthesize(&a, &b, 10, length).unwrap()));
                },
            );
        }
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let source = fixtures::source(1_000_000).unwrap();
    let stream = StreamSynthesizer::new(&source, 4)
        .synthesize(&offsets::derive(3, 100), &offsets::derive(4, 100), 10, 1_000_000)
        .unwrap();
    let pattern = Pattern::new(vec![3, 1, 4, 1], Some(vec![2, 0, 5])).unwrap();

    let mut group = c.benchmark_group("search");
    group.sample_size(10);
    group.throughput(Throughput::Elements(stream.len() as u64));
    for threads in [1usize, 4] {
        let matcher = PatternMatcher::new(threads);
        group.bench_function(format!("threads_{threads}"), |bench| {
            bench.iter(|| black_box(matcher.find(&pattern, &stream, 10_000, 0, 25)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_derive, bench_synthesize, bench_search);
criterion_main!(benches);
