//! Benchmarks for opstats accumulators and aggregation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use opstats::cardinality::HyperLogLog;
use opstats::config::{EstimateThreshold, ExtendedConfig, MomentConfig};
use opstats::extended::{aggregate_extended, ExtendedAccumulator};
use opstats::quantiles::TDigest;
use opstats::statistics::{aggregate_moments, CovarianceAccumulator, MomentAccumulator};
use opstats::traits::{CardinalitySketch, QuantileSketch, Sketch};

// ============================================================================
// Moment Benchmarks
// ============================================================================

fn bench_moments(c: &mut Criterion) {
    let mut group = c.benchmark_group("moments");
    group.throughput(Throughput::Elements(1));

    group.bench_function("add", |b| {
        let mut acc = MomentAccumulator::new(MomentConfig::default());
        let mut i = 0u64;
        b.iter(|| {
            acc.add(black_box(i as f64));
            i = i.wrapping_add(1);
        });
    });

    group.bench_function("covariance_add", |b| {
        let mut acc = CovarianceAccumulator::new(Default::default());
        let mut i = 0u64;
        b.iter(|| {
            acc.add(black_box(i as f64), black_box((i * 3 % 17) as f64));
            i = i.wrapping_add(1);
        });
    });

    let shards: Vec<_> = (0..64)
        .map(|shard| {
            let mut acc = MomentAccumulator::new(MomentConfig::default());
            for i in 0..1_000 {
                acc.add((shard * 1_000 + i) as f64);
            }
            acc.get().unwrap()
        })
        .collect();

    group.bench_function("aggregate_64_shards", |b| {
        b.iter(|| black_box(aggregate_moments(&shards, MomentConfig::default())));
    });

    group.finish();
}

// ============================================================================
// Extended Benchmarks
// ============================================================================

fn bench_extended(c: &mut Criterion) {
    let mut group = c.benchmark_group("extended");
    group.throughput(Throughput::Elements(1));

    for (name, threshold) in [
        ("add_buffering", EstimateThreshold::After(usize::MAX)),
        ("add_estimating", EstimateThreshold::Immediate),
    ] {
        group.bench_function(name, |b| {
            let config = ExtendedConfig::default().with_threshold(threshold);
            let mut acc = ExtendedAccumulator::new(config).unwrap();
            let mut i = 0u64;
            b.iter(|| {
                acc.add(black_box((i % 10_000) as f64));
                i = i.wrapping_add(1);
            });
        });
    }

    let snapshots: Vec<_> = [EstimateThreshold::FromErrorRate, EstimateThreshold::Immediate]
        .into_iter()
        .cycle()
        .take(8)
        .enumerate()
        .map(|(shard, threshold)| {
            let config = ExtendedConfig::default().with_threshold(threshold);
            let mut acc = ExtendedAccumulator::new(config).unwrap();
            for i in 0..5_000 {
                acc.add((shard * 5_000 + i) as f64);
            }
            acc.get_parallel()
        })
        .collect();

    group.bench_function("aggregate_mixed", |b| {
        b.iter(|| black_box(aggregate_extended(&snapshots, MomentConfig::default()).unwrap()));
    });

    let merged = aggregate_extended(&snapshots, MomentConfig::default()).unwrap();
    group.bench_function("calculate", |b| {
        b.iter(|| black_box(merged.calculate(&[1, 5, 95, 99]).unwrap()));
    });

    group.finish();
}

// ============================================================================
// Sketch Benchmarks
// ============================================================================

fn bench_hll(c: &mut Criterion) {
    let mut group = c.benchmark_group("hyperloglog");
    group.throughput(Throughput::Elements(1));

    for precision in [10, 14, 18] {
        group.bench_function(format!("insert_p{}", precision), |b| {
            let mut hll = HyperLogLog::new(precision);
            let mut i = 0u64;
            b.iter(|| {
                hll.insert_f64(i as f64);
                i = i.wrapping_add(1);
            });
        });
    }

    group.bench_function("estimate", |b| {
        let mut hll = HyperLogLog::new(14);
        for i in 0..100_000 {
            hll.insert_f64(i as f64);
        }
        b.iter(|| black_box(hll.estimate()));
    });

    group.bench_function("merge", |b| {
        let mut hll1 = HyperLogLog::new(14);
        let mut hll2 = HyperLogLog::new(14);
        for i in 0..10_000 {
            hll1.insert_f64(i as f64);
            hll2.insert_f64((i + 10_000) as f64);
        }
        b.iter(|| {
            let mut merged = hll1.clone();
            merged.merge(&hll2).unwrap();
            black_box(merged)
        });
    });

    group.finish();
}

fn bench_tdigest(c: &mut Criterion) {
    let mut group = c.benchmark_group("tdigest");
    group.throughput(Throughput::Elements(1));

    for compression in [100.0, 200.0] {
        group.bench_function(format!("add_c{}", compression), |b| {
            let mut digest = TDigest::new(compression);
            let mut i = 0u64;
            b.iter(|| {
                digest.add((i % 10_000) as f64);
                i = i.wrapping_add(1);
            });
        });
    }

    group.bench_function("quantile", |b| {
        let mut digest = TDigest::new(100.0);
        digest.add_batch((0..100_000).map(f64::from));
        digest.compress();
        b.iter(|| black_box(digest.quantile(0.99)));
    });

    group.bench_function("state_rebuild", |b| {
        let mut digest = TDigest::new(100.0);
        digest.add_batch((0..100_000).map(f64::from));
        let state = digest.to_state();
        b.iter(|| black_box(TDigest::from_state(state.clone()).unwrap()));
    });

    group.finish();
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(benches, bench_moments, bench_extended, bench_hll, bench_tdigest);

criterion_main!(benches);
