//! Sparsity-aware squared-L2 kernels.
//!
//! Each kernel rearranges the dense baseline around one sparse
//! representation (explicit scores plus a shared fill for every other
//! position), so untouched positions can be handled in bulk instead of one
//! at a time.

use std::cmp::Ordering;

use super::dense::dense_dense;
use super::SparseVector;

/// Linear merge of a sparse side against a dense side.
///
/// Walks the sparse entries in position order; the gaps between them are
/// runs of the sparse side's fill score compared against the dense side
/// directly. Squared distance is symmetric, so this serves both the
/// sparse-query/dense-reference and dense-query/sparse-reference pairings.
pub fn sparse_dense(sparse: &SparseVector, dense: &[f64]) -> f64 {
    debug_assert_eq!(sparse.len(), dense.len(), "vector lengths must match");

    let fill = sparse.fill();
    let mut l2 = 0.0;
    let mut i = 0;

    for entry in sparse.entries() {
        for &d in &dense[i..entry.position] {
            let delta = d - fill;
            l2 += delta * delta;
        }
        let delta = dense[entry.position] - entry.score;
        l2 += delta * delta;
        i = entry.position + 1;
    }

    for &d in &dense[i..] {
        let delta = d - fill;
        l2 += delta * delta;
    }

    l2
}

/// Densify the sparse reference into `scratch`, then run the dense baseline.
///
/// `scratch` must have the vectors' length; its prior contents are ignored
/// and fully overwritten.
pub fn densified(query: &[f64], reference: &SparseVector, scratch: &mut [f64]) -> f64 {
    reference.densify_into(scratch);
    dense_dense(query, scratch)
}

/// Densified variant that stores only each entry's delta from the fill
/// score, then resets the touched slots, so the next call never needs a full
/// re-fill.
///
/// `scratch` must have the vectors' length and be all zeros on entry; it is
/// all zeros again on return.
pub fn densified_delta(query: &[f64], reference: &SparseVector, scratch: &mut [f64]) -> f64 {
    debug_assert_eq!(query.len(), reference.len(), "vector lengths must match");
    debug_assert_eq!(scratch.len(), query.len(), "scratch length must match");
    debug_assert!(scratch.iter().all(|&x| x == 0.0), "scratch must start zeroed");

    let fill = reference.fill();
    for entry in reference.entries() {
        scratch[entry.position] = entry.score - fill;
    }

    let mut l2 = 0.0;
    for (q, delta_from_fill) in query.iter().zip(scratch.iter()) {
        let delta = q - (delta_from_fill + fill);
        l2 += delta * delta;
    }

    for entry in reference.entries() {
        scratch[entry.position] = 0.0;
    }

    l2
}

/// Two-pointer merge over both sparse lists.
///
/// Positions listed on one side only compare that side's score against the
/// other side's fill; matched positions compare scores directly. Positions
/// listed on neither side all contribute the same fill-vs-fill term, added
/// once in closed form.
pub fn sparse_sparse(query: &SparseVector, reference: &SparseVector) -> f64 {
    debug_assert_eq!(query.len(), reference.len(), "vector lengths must match");

    let q = query.entries();
    let r = reference.entries();
    let q_fill = query.fill();
    let r_fill = reference.fill();

    let mut l2 = 0.0;
    let mut i = 0;
    let mut j = 0;
    let mut matched = 0;

    while i < q.len() && j < r.len() {
        match q[i].position.cmp(&r[j].position) {
            Ordering::Less => {
                let delta = q[i].score - r_fill;
                l2 += delta * delta;
                i += 1;
            }
            Ordering::Greater => {
                let delta = r[j].score - q_fill;
                l2 += delta * delta;
                j += 1;
            }
            Ordering::Equal => {
                let delta = q[i].score - r[j].score;
                l2 += delta * delta;
                i += 1;
                j += 1;
                matched += 1;
            }
        }
    }

    for entry in &q[i..] {
        let delta = entry.score - r_fill;
        l2 += delta * delta;
    }
    for entry in &r[j..] {
        let delta = entry.score - q_fill;
        l2 += delta * delta;
    }

    let untouched = query.len() - q.len() - (r.len() - matched);
    let delta = q_fill - r_fill;
    l2 + untouched as f64 * delta * delta
}

/// Single-pass expansion of the merge via `(q - r)^2 = q^2 - 2qr + r^2`.
///
/// Standardized vectors have score sum 0 and squared-score sum
/// `query_sum_squares` (0.25 unless degenerate), which collapses every term
/// not touching an explicit reference entry into two constants. One pass
/// over the reference entries then suffices, at a documented cost in
/// numerical stability relative to the other kernels.
pub fn unstable(query: &[f64], query_sum_squares: f64, reference: &SparseVector) -> f64 {
    debug_assert_eq!(query.len(), reference.len(), "vector lengths must match");

    let fill = reference.fill();
    let mut l2 = 0.0;
    for entry in reference.entries() {
        let target = query[entry.position];
        let delta_from_fill = entry.score - fill;
        l2 += delta_from_fill * (delta_from_fill - 2.0 * target);
    }

    query_sum_squares + l2 - query.len() as f64 * fill * fill
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Standardized;
    use crate::rank::SparseScore;

    fn sparse(len: usize, entries: &[(usize, f64)], fill: f64) -> SparseVector {
        let entries = entries
            .iter()
            .map(|&(position, score)| SparseScore { position, score })
            .collect();
        SparseVector::new(len, entries, fill)
    }

    #[test]
    fn test_sparse_sparse_disjoint() {
        // One explicit score on each side, zero fill elsewhere:
        // (0.5)^2 + (0.5)^2 = 0.5.
        let q = sparse(4, &[(1, 0.5)], 0.0);
        let r = sparse(4, &[(2, -0.5)], 0.0);
        assert!((sparse_sparse(&q, &r) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_merge_kernels_match_baseline() {
        let q = sparse(6, &[(0, -0.3), (2, 0.1), (5, 0.4)], -0.05);
        let r = sparse(6, &[(2, 0.2), (3, -0.4)], 0.05);
        let baseline = dense_dense(&q.to_dense(), &r.to_dense());

        assert!((sparse_dense(&r, &q.to_dense()) - baseline).abs() < 1e-12);
        assert!((sparse_dense(&q, &r.to_dense()) - baseline).abs() < 1e-12);
        assert!((sparse_sparse(&q, &r) - baseline).abs() < 1e-12);

        let mut scratch = vec![0.0; 6];
        assert!((densified(&q.to_dense(), &r, &mut scratch) - baseline).abs() < 1e-12);
    }

    #[test]
    fn test_densified_delta_restores_scratch() {
        let q = sparse(5, &[(1, 0.2)], -0.1);
        let r = sparse(5, &[(0, -0.5), (4, 0.3)], 0.1);
        let baseline = dense_dense(&q.to_dense(), &r.to_dense());

        let mut scratch = vec![0.0; 5];
        let first = densified_delta(&q.to_dense(), &r, &mut scratch);
        assert!(scratch.iter().all(|&x| x == 0.0));

        // Reusable without a re-fill.
        let second = densified_delta(&q.to_dense(), &r, &mut scratch);
        assert_eq!(first.to_bits(), second.to_bits());
        assert!((first - baseline).abs() < 1e-12);
    }

    #[test]
    fn test_empty_sparse_side() {
        let q = sparse(4, &[], 0.25);
        let r = sparse(4, &[(1, -0.2)], 0.0);
        let baseline = dense_dense(&q.to_dense(), &r.to_dense());
        assert!((sparse_sparse(&q, &r) - baseline).abs() < 1e-12);
        assert!((sparse_dense(&q, &r.to_dense()) - baseline).abs() < 1e-12);
    }

    #[test]
    fn test_unstable_on_standardized_inputs() {
        // The closed form assumes real transform outputs, so build some.
        let query = Standardized::from_raw(&[0.0, 3.0, -1.0, 0.0, 2.0, 0.0, -4.0]);
        let reference = Standardized::from_raw(&[1.0, 0.0, 0.0, -2.0, 0.0, 5.0, 1.0]);

        let baseline = dense_dense(query.dense(), reference.dense());
        let got = unstable(query.dense(), query.sum_squares(), reference.sparse());
        assert!(
            (got - baseline).abs() / baseline < 1e-10,
            "got {got}, baseline {baseline}"
        );
    }

    #[test]
    fn test_unstable_degenerate_reference() {
        let query = Standardized::from_raw(&[0.0, 3.0, -1.0, 0.0]);
        let reference = Standardized::from_raw(&[0.0; 4]);

        let baseline = dense_dense(query.dense(), reference.dense());
        let got = unstable(query.dense(), query.sum_squares(), reference.sparse());
        assert!((got - baseline).abs() < 1e-12);
    }
}
