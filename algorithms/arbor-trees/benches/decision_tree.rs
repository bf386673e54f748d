use arbor::benchmarks::config;
use arbor::prelude::*;
use arbor_trees::{DecisionTree, DistributedForestBuilder, RandomForestClassifier};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{concatenate, Array, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::{StandardNormal, Uniform};
use ndarray_rand::RandomExt;
use rand::rngs::SmallRng;

fn generate_blobs(means: &Array2<f64>, samples: usize, mut rng: &mut SmallRng) -> Array2<f64> {
    let out = means
        .axis_iter(Axis(0))
        .map(|mean| Array::random_using((samples, 4), StandardNormal, &mut rng) + mean)
        .collect::<Vec<_>>();
    let out2 = out.iter().map(|x| x.view()).collect::<Vec<_>>();

    concatenate(Axis(0), &out2).unwrap()
}

/// Two gaussian blobs, one per label, with `n` rows each
fn two_blobs(n: usize, rng: &mut SmallRng) -> Matrix<f64, bool> {
    let centroids = Array2::random_using((2, 4), Uniform::new(-3., 3.), rng);
    let records = generate_blobs(&centroids, n, rng);
    let labels = (0..2 * n).map(|i| i < n);

    Matrix::from_records(&records, labels).unwrap()
}

fn decision_tree_bench(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);

    // Controls how many samples for each label are generated
    let training_set_sizes = &[100, 1000, 10000];

    // Use the default configuration
    let hyperparams = DecisionTree::params();

    let mut group = c.benchmark_group("decision_tree");
    config::set_default_benchmark_configs(&mut group);

    for n in training_set_sizes.iter() {
        let matrix = two_blobs(*n, &mut rng);

        group.bench_with_input(BenchmarkId::from_parameter(n), &matrix, |b, d| {
            b.iter(|| hyperparams.fit(d))
        });
    }

    group.finish();
}

fn random_forest_bench(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);
    let matrix = two_blobs(1000, &mut rng);

    let mut group = c.benchmark_group("random_forest");
    config::set_default_benchmark_configs(&mut group);

    for n_trees in &[8, 32] {
        let params = RandomForestClassifier::params().n_trees(*n_trees);

        group.bench_with_input(
            BenchmarkId::new("sequential", n_trees),
            &matrix,
            |b, d| b.iter(|| params.fit(d)),
        );

        let distributed = DistributedForestBuilder::new(params.clone()).n_workers(4);
        group.bench_with_input(
            BenchmarkId::new("distributed", n_trees),
            &matrix,
            |b, d| b.iter(|| distributed.fit(d)),
        );
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = config::get_default_benchmark_configs();
    targets = decision_tree_bench, random_forest_bench
}
criterion_main!(benches);
