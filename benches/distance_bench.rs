use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rankdist::rank::{collect_sorted, split_by_sign, standardize};
use rankdist::{squared_distance, Scratch, Standardized, Strategy};

fn generate_raw(length: usize, density: f64, rng: &mut StdRng) -> Vec<f64> {
    (0..length)
        .map(|_| {
            if rng.gen::<f64>() <= density {
                rng.sample::<f64, _>(StandardNormal)
            } else {
                0.0
            }
        })
        .collect()
}

fn bench_strategies(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(69);

    for density in [0.05, 0.2, 0.5] {
        let mut group = c.benchmark_group(format!("squared_distance/density_{density}"));

        for length in [1_000, 10_000, 100_000] {
            let query = Standardized::from_raw(&generate_raw(length, density, &mut rng));
            let reference = Standardized::from_raw(&generate_raw(length, density, &mut rng));
            let mut scratch = Scratch::new(length);

            group.throughput(Throughput::Elements(length as u64));

            for strategy in Strategy::ALL {
                group.bench_with_input(
                    BenchmarkId::new(strategy.name(), length),
                    &length,
                    |bencher, _| {
                        bencher.iter(|| {
                            squared_distance(
                                black_box(&query),
                                black_box(&reference),
                                strategy,
                                &mut scratch,
                            )
                        })
                    },
                );
            }
        }

        group.finish();
    }
}

fn bench_transform(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(69);
    let mut group = c.benchmark_group("standardize");

    for length in [1_000, 10_000, 100_000] {
        let raw = generate_raw(length, 0.2, &mut rng);
        let collected = collect_sorted(&raw);
        let (negative, positive) = split_by_sign(&raw);

        group.throughput(Throughput::Elements(length as u64));

        group.bench_with_input(
            BenchmarkId::new("single_collection", length),
            &length,
            |bencher, _| bencher.iter(|| standardize(black_box(&collected))),
        );

        group.bench_with_input(BenchmarkId::new("split", length), &length, |bencher, _| {
            let mut out = Vec::with_capacity(length);
            bencher.iter(|| {
                rankdist::standardize_split(
                    length,
                    black_box(&negative),
                    black_box(&positive),
                    &mut out,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_transform);
criterion_main!(benches);
