//! Cross-strategy consistency checking.
//!
//! The distance kernels never self-check; agreement between strategies is
//! verified here instead, as an explicit operation that tests, benches, and
//! the CLI driver all share. Every strategy is compared against the
//! dense/dense baseline and must land within its tolerance.

use crate::distance::{squared_distance, Scratch, Standardized, Strategy};

/// Relative tolerance for the exact algebraic reformulations.
pub const RELATIVE_TOLERANCE: f64 = 1e-8;

/// Looser bound for the single-pass expansion, which cancels large terms
/// against each other and is documented as approximate.
pub const UNSTABLE_RELATIVE_TOLERANCE: f64 = 1e-6;

/// The agreement bound a strategy is held to.
pub fn tolerance_for(strategy: Strategy) -> f64 {
    match strategy {
        Strategy::Unstable => UNSTABLE_RELATIVE_TOLERANCE,
        _ => RELATIVE_TOLERANCE,
    }
}

/// One strategy's result and its deviation from the baseline.
#[derive(Debug, Clone, Copy)]
pub struct StrategyResult {
    pub strategy: Strategy,
    pub value: f64,
    /// Relative to the baseline; absolute when the baseline is 0.
    pub relative_error: f64,
}

impl StrategyResult {
    pub fn is_within_tolerance(&self) -> bool {
        self.relative_error <= tolerance_for(self.strategy)
    }
}

/// Results of running every strategy over one input pair.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub baseline: f64,
    pub results: Vec<StrategyResult>,
}

impl ConformanceReport {
    /// True when every strategy landed within its tolerance.
    pub fn is_consistent(&self) -> bool {
        self.results.iter().all(StrategyResult::is_within_tolerance)
    }

    /// The strategy furthest from the baseline.
    pub fn worst(&self) -> Option<&StrategyResult> {
        self.results
            .iter()
            .max_by(|a, b| a.relative_error.total_cmp(&b.relative_error))
    }
}

/// Run every strategy over one input pair and report each result against the
/// dense/dense baseline.
pub fn check_strategies(query: &Standardized, reference: &Standardized) -> ConformanceReport {
    let mut scratch = Scratch::new(query.len());
    let baseline = squared_distance(query, reference, Strategy::DenseDense, &mut scratch);

    let results = Strategy::ALL
        .iter()
        .map(|&strategy| {
            let value = squared_distance(query, reference, strategy, &mut scratch);
            let deviation = (value - baseline).abs();
            let relative_error = if baseline != 0.0 {
                deviation / baseline
            } else {
                deviation
            };
            StrategyResult {
                strategy,
                value,
                relative_error,
            }
        })
        .collect();

    ConformanceReport { baseline, results }
}
