//! Rank transform: raw values become tie-aware, variance-normalized scores.
//!
//! Each value is replaced by its rank (ties share the mean of the ranks the
//! run would occupy), ranks are centered so they sum to zero, and the whole
//! vector is scaled so its sum of squared scores is a fixed constant. Two
//! input shapes are supported: a fully explicit collection covering every
//! position, and a sign-split form where only nonzero values are listed and
//! the remaining positions form one implicit run of exact zeros.

use std::cmp::Ordering;

/// Sum of squared scores of any non-degenerate standardized vector.
///
/// Follows directly from the `0.5 / sqrt(sum_squares)` scaling: the squared
/// scores sum to `0.25` regardless of length or tie structure. The
/// closed-form distance strategy depends on this exact constant; it does not
/// hold for any other scaling.
pub const SCORE_SUM_SQUARES: f64 = 0.25;

/// A raw value tagged with its original position in the vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedEntry {
    pub value: f64,
    pub position: usize,
}

impl RankedEntry {
    pub fn new(value: f64, position: usize) -> Self {
        Self { value, position }
    }
}

/// A standardized score at a specific position.
///
/// Emitted only for positions whose raw value was explicitly listed; all
/// other positions share a single fill score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseScore {
    pub position: usize,
    pub score: f64,
}

/// Sort entries ascending by raw value, the order the transforms require.
pub fn sort_by_value(entries: &mut [RankedEntry]) {
    entries.sort_unstable_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));
}

fn is_sorted_by_value(entries: &[RankedEntry]) -> bool {
    entries.windows(2).all(|w| w[0].value <= w[1].value)
}

/// Standardize a fully explicit vector.
///
/// `collected` must hold exactly one entry per position in `[0, N)` where
/// `N = collected.len()`, sorted ascending by value. `ranks` is caller-owned
/// scratch of length N; its prior contents are ignored and fully
/// overwritten. Scores are delivered through `emit` as `(position, score)`
/// pairs, exactly once per position in increasing position order.
///
/// If every value is identical there is no variance to normalize against and
/// every emitted score is exactly 0.
pub fn standardize_with<F>(collected: &[RankedEntry], ranks: &mut [f64], mut emit: F)
where
    F: FnMut(usize, f64),
{
    let n = collected.len();
    assert_eq!(ranks.len(), n, "scratch length must match vector length");
    debug_assert!(
        is_sorted_by_value(collected),
        "entries must be sorted ascending by value"
    );

    if n == 0 {
        return;
    }

    let center = (n as f64 - 1.0) / 2.0;
    let mut sum_squares = 0.0;
    let mut cur_rank = 0usize;

    // Computing tied ranks.
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && collected[end].value == collected[start].value {
            end += 1;
        }

        let jump = end - start;
        let mean_rank = cur_rank as f64 + (jump as f64 - 1.0) / 2.0 - center;
        sum_squares += mean_rank * mean_rank * jump as f64;

        for entry in &collected[start..end] {
            assert!(
                entry.position < n,
                "position {} out of bounds for length {}",
                entry.position,
                n
            );
            ranks[entry.position] = mean_rank;
        }

        cur_rank += jump;
        start = end;
    }

    // No variance: all scores are left at zero.
    if sum_squares == 0.0 {
        for i in 0..n {
            emit(i, 0.0);
        }
    } else {
        let denom = 0.5 / sum_squares.sqrt();
        for i in 0..n {
            emit(i, ranks[i] * denom);
        }
    }
}

/// Standardize a fully explicit vector into a freshly allocated dense array.
pub fn standardize(collected: &[RankedEntry]) -> Vec<f64> {
    let mut ranks = vec![0.0; collected.len()];
    let mut out = vec![0.0; collected.len()];
    standardize_with(collected, &mut ranks, |position, score| {
        out[position] = score;
    });
    out
}

/// Standardize a vector given only its nonzero values, split by sign.
///
/// `negative` holds the strictly negative raw values and `positive` the
/// strictly positive ones, each sorted ascending by value. The remaining
/// `n - negative.len() - positive.len()` positions are an implicit run of
/// exact zeros, ranked as one tied run between the two groups.
///
/// `out` is cleared and filled with the explicit positions' final scores (in
/// value order, not position order). `zero` receives the shared fill score,
/// exactly once and before any `emit`; `emit` then streams each explicit
/// `(position, score)` pair. In the no-variance case (every raw value was
/// zero, or all values identical) the fill is exactly 0 and `out` is left
/// empty, so the sparse representation is "nothing explicit, fill 0".
pub fn standardize_split_with<Z, E>(
    n: usize,
    negative: &[RankedEntry],
    positive: &[RankedEntry],
    out: &mut Vec<SparseScore>,
    zero: Z,
    mut emit: E,
) where
    Z: FnOnce(f64),
    E: FnMut(usize, f64),
{
    out.clear();
    if n == 0 {
        assert!(
            negative.is_empty() && positive.is_empty(),
            "explicit entries supplied for an empty vector"
        );
        zero(0.0);
        return;
    }

    assert!(
        negative.len() + positive.len() <= n,
        "more explicit values ({}) than positions ({})",
        negative.len() + positive.len(),
        n
    );
    debug_assert!(is_sorted_by_value(negative) && is_sorted_by_value(positive));
    debug_assert!(negative.iter().all(|e| e.value < 0.0));
    debug_assert!(positive.iter().all(|e| e.value > 0.0));

    let center = (n as f64 - 1.0) / 2.0;
    let mut sum_squares = 0.0;
    let mut cur_rank = 0usize;

    // Computing tied ranks: before, at, and after zero.
    rank_runs(negative, n, center, &mut cur_rank, &mut sum_squares, out);

    let num_zero = n - negative.len() - positive.len();
    let mut zero_rank = 0.0;
    if num_zero > 0 {
        zero_rank = cur_rank as f64 + (num_zero as f64 - 1.0) / 2.0 - center;
        sum_squares += zero_rank * zero_rank * num_zero as f64;
        cur_rank += num_zero;
    }

    rank_runs(positive, n, center, &mut cur_rank, &mut sum_squares, out);

    // No variance: report an all-zero vector and drop the explicit entries.
    if sum_squares == 0.0 {
        zero(0.0);
        out.clear();
        return;
    }

    let denom = 0.5 / sum_squares.sqrt();
    zero(zero_rank * denom);
    for entry in out.iter_mut() {
        entry.score *= denom;
        emit(entry.position, entry.score);
    }
}

/// Walk one sorted group, pushing each entry's mean (tied) rank and
/// accumulating the group's variance contribution.
fn rank_runs(
    group: &[RankedEntry],
    n: usize,
    center: f64,
    cur_rank: &mut usize,
    sum_squares: &mut f64,
    out: &mut Vec<SparseScore>,
) {
    let mut start = 0;
    while start < group.len() {
        let mut end = start + 1;
        while end < group.len() && group[end].value == group[start].value {
            end += 1;
        }

        let jump = end - start;
        let mean_rank = *cur_rank as f64 + (jump as f64 - 1.0) / 2.0 - center;
        *sum_squares += mean_rank * mean_rank * jump as f64;

        for entry in &group[start..end] {
            assert!(
                entry.position < n,
                "position {} out of bounds for length {}",
                entry.position,
                n
            );
            out.push(SparseScore {
                position: entry.position,
                score: mean_rank,
            });
        }

        *cur_rank += jump;
        start = end;
    }
}

/// Split-form wrapper that materializes the sparse scores into `out` and
/// returns the shared fill score.
pub fn standardize_split(
    n: usize,
    negative: &[RankedEntry],
    positive: &[RankedEntry],
    out: &mut Vec<SparseScore>,
) -> f64 {
    let mut fill = 0.0;
    standardize_split_with(n, negative, positive, out, |z| fill = z, |_, _| {});
    fill
}

/// Partition a raw dense vector into the sorted sign groups the split
/// transform expects. Exact zeros are dropped; their count is implied by the
/// vector length.
pub fn split_by_sign(values: &[f64]) -> (Vec<RankedEntry>, Vec<RankedEntry>) {
    let mut negative = Vec::new();
    let mut positive = Vec::new();
    for (position, &value) in values.iter().enumerate() {
        if value < 0.0 {
            negative.push(RankedEntry::new(value, position));
        } else if value > 0.0 {
            positive.push(RankedEntry::new(value, position));
        }
    }
    sort_by_value(&mut negative);
    sort_by_value(&mut positive);
    (negative, positive)
}

/// Collect a raw dense vector into the sorted explicit form the
/// single-collection transform expects.
pub fn collect_sorted(values: &[f64]) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = values
        .iter()
        .enumerate()
        .map(|(position, &value)| RankedEntry::new(value, position))
        .collect();
    sort_by_value(&mut entries);
    entries
}
