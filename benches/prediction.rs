//! Prediction benchmarks for bigml-local.
//!
//! Benchmarks cover:
//! - Single row prediction latency per model kind
//! - Ensemble fan-out with different thread counts
//!
//! # Running benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! # Results
//!
//! HTML reports are generated in `target/criterion/`.

use std::fs::File;
use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::Value;

use bigml_local::model::{Anomaly, Cluster, Ensemble, Model};
use bigml_local::{InputRecord, PredictOptions};

// =============================================================================
// Benchmark Data Setup
// =============================================================================

/// Path to the resource fixtures.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases/bigml")
}

fn load_resource(name: &str) -> Value {
    let path = fixtures_dir().join(format!("{name}.json"));
    let file = File::open(&path).unwrap_or_else(|_| panic!("Failed to open resource: {:?}", path));
    serde_json::from_reader(file).expect("Failed to parse resource")
}

fn by_name() -> PredictOptions {
    PredictOptions::builder().by_name(true).build()
}

// =============================================================================
// Benchmark Groups
// =============================================================================

/// Benchmark single-row latency of every model kind.
fn bench_single_row(c: &mut Criterion) {
    let model = Model::from_value(load_resource("iris")).expect("Failed to load model");
    let anomaly = Anomaly::from_value(load_resource("anomaly")).expect("Failed to load anomaly");
    let cluster = Cluster::from_value(load_resource("cluster")).expect("Failed to load cluster");
    let options = by_name();

    let iris_row = InputRecord::new()
        .with("sepal width", 3.15)
        .with("petal length", 4.07)
        .with("petal width", 1.51);
    c.bench_function("single_row/model", |b| {
        b.iter(|| black_box(model.predict(black_box(&iris_row), &options)))
    });

    let anomaly_row = InputRecord::new().with("x", 1.5).with("kind", "a");
    c.bench_function("single_row/anomaly", |b| {
        b.iter(|| black_box(anomaly.score(black_box(&anomaly_row), &options)))
    });

    let cluster_row = InputRecord::new()
        .with("age", 34.0)
        .with("tag", "machine learning")
        .with("segment", "gold");
    c.bench_function("single_row/cluster", |b| {
        b.iter(|| black_box(cluster.centroid(black_box(&cluster_row), &options)))
    });
}

/// Benchmark ensemble prediction with different fan-out settings.
fn bench_ensemble_threads(c: &mut Criterion) {
    let ensemble = Ensemble::from_value(load_resource("ensemble")).expect("Failed to load ensemble");
    let row = InputRecord::new().with("x", 1.5);

    let mut group = c.benchmark_group("ensemble_threads");
    for n_threads in [1usize, 0, 2] {
        let options = PredictOptions::builder()
            .by_name(true)
            .n_threads(n_threads)
            .build();
        group.bench_with_input(BenchmarkId::new("predict", n_threads), &options, |b, options| {
            b.iter(|| black_box(ensemble.predict(black_box(&row), options)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_row, bench_ensemble_threads);
criterion_main!(benches);
