//! RankDist CLI - benchmark and consistency driver.
//!
//! Generates synthetic sparse vectors, standardizes them, and either times
//! the distance strategies against each other or sweeps randomized inputs
//! through the conformance check.

use std::cell::Cell;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::info;

use rankdist::conformance::{self, check_strategies};
use rankdist::distance::{sparse, squared_distance, Scratch, SparseVector, Standardized, Strategy};
use rankdist::rank::{
    collect_sorted, split_by_sign, standardize_split_with, standardize_with, SCORE_SUM_SQUARES,
};

#[derive(Parser)]
#[command(name = "rankdist")]
#[command(about = "Sparse squared-L2 strategy benchmarks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Time every distance strategy over synthetic standardized vectors
    Bench {
        /// Length of the simulated vectors
        #[arg(short, long, default_value_t = 1000)]
        length: usize,

        /// Density of non-zero elements in the simulated vectors
        #[arg(short, long, default_value_t = 0.2)]
        density: f64,

        /// Number of iterations
        #[arg(short, long, default_value_t = 100)]
        iter: usize,

        /// Seed for the simulated data
        #[arg(short, long, default_value_t = 69)]
        seed: u64,

        /// Run the reference-side rank transform inside the timed region
        #[arg(long)]
        fused: bool,
    },

    /// Check cross-strategy agreement over randomized inputs
    Check {
        /// Length of the simulated vectors
        #[arg(short, long, default_value_t = 1000)]
        length: usize,

        /// Density of non-zero elements in the simulated vectors
        #[arg(short, long, default_value_t = 0.2)]
        density: f64,

        /// Number of randomized input pairs
        #[arg(short, long, default_value_t = 100)]
        runs: usize,

        /// Seed for the simulated data
        #[arg(short, long, default_value_t = 69)]
        seed: u64,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Bench {
            length,
            density,
            iter,
            seed,
            fused,
        } => run_bench(length, density, iter, seed, fused),
        Commands::Check {
            length,
            density,
            runs,
            seed,
        } => run_check(length, density, runs, seed),
    }
}

/// One synthetic raw vector: each position is nonzero with probability
/// `density`, values drawn standard-normal.
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

/// Mean and standard-error-of-mean percentage over per-iteration timings.
fn summarize(times_us: &[f64]) -> (f64, f64) {
    let n = times_us.len() as f64;
    let mean = times_us.iter().sum::<f64>() / n;
    if times_us.len() < 2 || mean == 0.0 {
        return (mean, 0.0);
    }
    let var = times_us.iter().map(|t| (t - mean) * (t - mean)).sum::<f64>() / (n - 1.0);
    let se = (var / n).sqrt();
    (mean, se / mean * 100.0)
}

fn report_timings(names: &[&str], timings: &[Vec<f64>]) {
    for (name, times) in names.iter().zip(timings.iter()) {
        let (mean, se_pct) = summarize(times);
        println!("{name:<32}: {mean:.3} us ± {se_pct:.2} %");
    }
}

/// Abort when a strategy disagrees with the iteration's first result.
fn enforce_agreement(name: &str, baseline: f64, value: f64, tolerance: f64) {
    let deviation = (value - baseline).abs();
    let relative = if baseline != 0.0 {
        deviation / baseline
    } else {
        deviation
    };
    if relative > tolerance {
        eprintln!("{baseline}\t{value}\t{name}");
        eprintln!("strategy disagreement exceeds tolerance {tolerance}");
        std::process::exit(1);
    }
}

fn run_bench(length: usize, density: f64, iterations: usize, seed: u64, fused: bool) {
    info!(length, density, iterations, seed, fused, "starting benchmark");
    let mut rng = StdRng::seed_from_u64(seed);

    if fused {
        run_bench_fused(length, density, iterations, &mut rng);
    } else {
        run_bench_precomputed(length, density, iterations, &mut rng);
    }
}

/// Strategies timed over pre-standardized inputs; only the distance itself
/// is inside the timed region.
fn run_bench_precomputed(length: usize, density: f64, iterations: usize, rng: &mut StdRng) {
    let names: Vec<&str> = Strategy::ALL.iter().map(|s| s.name()).collect();
    let mut timings: Vec<Vec<f64>> = names.iter().map(|_| Vec::with_capacity(iterations)).collect();
    let mut scratch = Scratch::new(length);

    for _ in 0..iterations {
        let query = Standardized::from_raw(&generate_raw(length, density, rng));
        let reference = Standardized::from_raw(&generate_raw(length, density, rng));

        let mut baseline = None;
        for (slot, &strategy) in Strategy::ALL.iter().enumerate() {
            let start = Instant::now();
            let value = squared_distance(&query, &reference, strategy, &mut scratch);
            timings[slot].push(start.elapsed().as_secs_f64() * 1e6);

            match baseline {
                None => baseline = Some(value),
                Some(expected) => enforce_agreement(
                    strategy.name(),
                    expected,
                    value,
                    conformance::tolerance_for(strategy),
                ),
            }
        }
    }

    report_timings(&names, &timings);
}

/// Strategies timed with the reference-side rank transform inside the timed
/// region, fed through the streaming sinks where the strategy allows it.
fn run_bench_fused(length: usize, density: f64, iterations: usize, rng: &mut StdRng) {
    let names = [
        "dense-dense",
        "sparse-dense",
        "dense-sparse",
        "dense-sparse-densified",
        "dense-sparse-densified-delta",
        "dense-sparse-unstable",
        "sparse-sparse",
    ];
    let mut timings: Vec<Vec<f64>> = names.iter().map(|_| Vec::with_capacity(iterations)).collect();

    // Reused across iterations; contents are overwritten per call.
    let mut ranks_buf = vec![0.0; length];
    let mut dense_ref_buf = vec![0.0; length];
    let mut densify_buf = vec![0.0; length];
    let mut delta_buf = vec![0.0; length];
    let mut split_buf = Vec::with_capacity(length);

    for _ in 0..iterations {
        let query = Standardized::from_raw(&generate_raw(length, density, rng));
        let raw_ref = generate_raw(length, density, rng);
        let full_ref = collect_sorted(&raw_ref);
        let (negative_ref, positive_ref) = split_by_sign(&raw_ref);

        let mut baseline = None;
        let mut record = |slot: usize, value: f64, tolerance: f64, baseline: &mut Option<f64>, elapsed: f64| {
            timings[slot].push(elapsed);
            match *baseline {
                None => *baseline = Some(value),
                Some(expected) => enforce_agreement(names[slot], expected, value, tolerance),
            }
        };

        // Single-collection transform streaming straight into the
        // accumulation.
        let start = Instant::now();
        let mut l2 = 0.0;
        standardize_with(&full_ref, &mut ranks_buf, |position, score| {
            let delta = query.dense()[position] - score;
            l2 += delta * delta;
        });
        record(
            0,
            l2,
            conformance::RELATIVE_TOLERANCE,
            &mut baseline,
            start.elapsed().as_secs_f64() * 1e6,
        );

        // Single-collection transform materializing the dense reference,
        // then the sparse query merged against it.
        let start = Instant::now();
        standardize_with(&full_ref, &mut ranks_buf, |position, score| {
            dense_ref_buf[position] = score;
        });
        let value = sparse::sparse_dense(query.sparse(), &dense_ref_buf);
        record(
            1,
            value,
            conformance::RELATIVE_TOLERANCE,
            &mut baseline,
            start.elapsed().as_secs_f64() * 1e6,
        );

        // Split transform into sparse form, merged against the dense query.
        let start = Instant::now();
        let reference = SparseVector::standardize_split(length, &negative_ref, &positive_ref);
        let value = sparse::sparse_dense(&reference, query.dense());
        record(
            2,
            value,
            conformance::RELATIVE_TOLERANCE,
            &mut baseline,
            start.elapsed().as_secs_f64() * 1e6,
        );

        // Split transform, reference densified into a reused buffer.
        let start = Instant::now();
        let reference = SparseVector::standardize_split(length, &negative_ref, &positive_ref);
        let value = sparse::densified(query.dense(), &reference, &mut densify_buf);
        record(
            3,
            value,
            conformance::RELATIVE_TOLERANCE,
            &mut baseline,
            start.elapsed().as_secs_f64() * 1e6,
        );

        // Split transform, deltas written into an all-zero buffer and reset
        // afterward.
        let start = Instant::now();
        let reference = SparseVector::standardize_split(length, &negative_ref, &positive_ref);
        let value = sparse::densified_delta(query.dense(), &reference, &mut delta_buf);
        record(
            4,
            value,
            conformance::RELATIVE_TOLERANCE,
            &mut baseline,
            start.elapsed().as_secs_f64() * 1e6,
        );

        // Split transform streaming into the single-pass expansion; the fill
        // score arrives through the zero sink before any entry is emitted.
        let start = Instant::now();
        let x2 = if query.sparse().entries().is_empty() {
            0.0
        } else {
            SCORE_SUM_SQUARES
        };
        let zero_ref = Cell::new(0.0);
        let mut l2 = 0.0;
        standardize_split_with(
            length,
            &negative_ref,
            &positive_ref,
            &mut split_buf,
            |fill| zero_ref.set(fill),
            |position, score| {
                let target = query.dense()[position];
                let delta = score - zero_ref.get();
                l2 += delta * (delta - 2.0 * target);
            },
        );
        let fill = zero_ref.get();
        let value = x2 + l2 - length as f64 * fill * fill;
        record(
            5,
            value,
            conformance::UNSTABLE_RELATIVE_TOLERANCE,
            &mut baseline,
            start.elapsed().as_secs_f64() * 1e6,
        );

        // Split transform into sparse form, merged entry lists.
        let start = Instant::now();
        let reference = SparseVector::standardize_split(length, &negative_ref, &positive_ref);
        let value = sparse::sparse_sparse(query.sparse(), &reference);
        record(
            6,
            value,
            conformance::RELATIVE_TOLERANCE,
            &mut baseline,
            start.elapsed().as_secs_f64() * 1e6,
        );
    }

    report_timings(&names, &timings);
}

fn run_check(length: usize, density: f64, runs: usize, seed: u64) {
    info!(length, density, runs, seed, "starting conformance sweep");
    let mut rng = StdRng::seed_from_u64(seed);

    let mut worst: Vec<(Strategy, f64)> = Strategy::ALL.iter().map(|&s| (s, 0.0)).collect();
    let mut failures = 0usize;

    for _ in 0..runs {
        let query = Standardized::from_raw(&generate_raw(length, density, &mut rng));
        let reference = Standardized::from_raw(&generate_raw(length, density, &mut rng));

        let report = check_strategies(&query, &reference);
        if !report.is_consistent() {
            failures += 1;
        }
        for (slot, result) in report.results.iter().enumerate() {
            if result.relative_error > worst[slot].1 {
                worst[slot].1 = result.relative_error;
            }
        }
    }

    println!("worst relative error over {runs} runs:");
    for (strategy, error) in &worst {
        println!(
            "{:<32}: {error:.3e} (tolerance {:.0e})",
            strategy.name(),
            conformance::tolerance_for(*strategy)
        );
    }

    if failures > 0 {
        eprintln!("{failures} of {runs} runs exceeded tolerance");
        std::process::exit(1);
    }
    println!("all {runs} runs consistent");
}
