//! Benchmarks for line normalization and domain aggregation.

use blocklist_merger::aggregator::DomainSet;
use blocklist_merger::normalizer::normalize;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

/// Generate raw lines cycling through the common list formats
fn generate_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 6 {
            0 => format!("0.0.0.0 ads{}.example.com", i),
            1 => format!("||track{}.example.net^$third-party", i),
            2 => format!("local=/cdn{}.example.org/", i),
            3 => format!("*.wild{}.example.com", i),
            4 => "# comment line".to_string(),
            _ => format!("Plain{}.Example.COM", i % 1000),
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for size in [1_000, 10_000, 100_000] {
        let lines = generate_lines(size);
        group.bench_with_input(BenchmarkId::new("lines", size), &lines, |b, lines| {
            b.iter(|| {
                lines
                    .iter()
                    .filter_map(|line| normalize(black_box(line)))
                    .count()
            });
        });
    }

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [1_000, 10_000, 100_000] {
        let domains: Vec<String> = generate_lines(size)
            .iter()
            .filter_map(|line| normalize(line))
            .collect();
        group.bench_with_input(
            BenchmarkId::new("add_and_snapshot", size),
            &domains,
            |b, domains| {
                b.iter(|| {
                    let set = DomainSet::new();
                    set.extend(domains.iter().cloned());
                    black_box(set.snapshot())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_aggregate);
criterion_main!(benches);
