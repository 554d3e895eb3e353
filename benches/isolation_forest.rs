use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use explainable_anomaly::anomaly::{AnomalyScorer, Autoencoder, IsolationForest};
use explainable_anomaly::dataset::Dataset;
use explainable_anomaly::pipeline::{run, PipelineConfig};
use explainable_anomaly::preprocessing::encode;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_dataset(n_rows: usize, n_features: usize) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut builder = Dataset::builder();

    for i in 0..n_features {
        let values: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect();
        builder = builder.numeric(format!("feature_{}", i), values);
    }
    let regions: Vec<&str> = (0..n_rows)
        .map(|_| ["north", "south", "east", "west"][rng.gen_range(0..4)])
        .collect();

    builder.categorical("region", regions).build().unwrap()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("scorers");
    group.sample_size(10);

    for n_rows in [1000, 10000].iter() {
        let (matrix, _) = encode(&create_dataset(*n_rows, 8)).unwrap();

        for parallel in [false, true] {
            let label = if parallel { "fit_parallel" } else { "fit_sequential" };
            group.bench_with_input(BenchmarkId::new(label, n_rows), &matrix, |b, m| {
                b.iter(|| {
                    let mut forest = IsolationForest::new().with_parallel(parallel);
                    forest.fit(black_box(m)).unwrap();
                    forest
                });
            });
        }

        group.bench_with_input(BenchmarkId::new("autoencoder_fit", n_rows), &matrix, |b, m| {
            b.iter(|| {
                let mut autoencoder = Autoencoder::new();
                autoencoder.fit(black_box(m)).unwrap();
                autoencoder
            });
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    for n_rows in [1000, 10000].iter() {
        let ds = create_dataset(*n_rows, 8);
        group.bench_with_input(BenchmarkId::new("run", n_rows), &ds, |b, ds| {
            b.iter(|| run(black_box(ds), &PipelineConfig::default()).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_pipeline);
criterion_main!(benches);
