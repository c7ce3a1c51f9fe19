//! Squared Euclidean distance between standardized vectors.
//!
//! A standardized vector can be held dense (one score per position) or
//! sparse (explicit scores plus one shared fill). The strategies here are
//! algebraically equivalent ways of computing the same squared distance,
//! each suited to a different representation pairing; all of them must agree
//! with the dense/dense baseline to within relative tolerance.

pub mod dense;
pub mod sparse;

use rayon::prelude::*;

use crate::rank::{self, SparseScore};

/// Sparse representation of a standardized vector: explicit scores at some
/// positions plus one fill score shared by every other position.
#[derive(Debug, Clone)]
pub struct SparseVector {
    len: usize,
    entries: Vec<SparseScore>,
    fill: f64,
}

impl SparseVector {
    /// Build from entries in any order. Entries are sorted by position;
    /// out-of-bounds or duplicate positions panic.
    pub fn new(len: usize, mut entries: Vec<SparseScore>, fill: f64) -> Self {
        entries.sort_unstable_by_key(|entry| entry.position);
        assert!(
            entries.last().map_or(true, |entry| entry.position < len),
            "sparse position out of bounds for length {len}"
        );
        assert!(
            entries.windows(2).all(|w| w[0].position < w[1].position),
            "duplicate sparse positions"
        );
        Self { len, entries, fill }
    }

    /// Standardize a sign-split input directly into sparse form.
    pub fn standardize_split(
        n: usize,
        negative: &[rank::RankedEntry],
        positive: &[rank::RankedEntry],
    ) -> Self {
        let mut entries = Vec::with_capacity(negative.len() + positive.len());
        let fill = rank::standardize_split(n, negative, positive, &mut entries);
        Self::new(n, entries, fill)
    }

    /// Full vector length, counting fill positions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Explicit entries, sorted ascending by position.
    pub fn entries(&self) -> &[SparseScore] {
        &self.entries
    }

    /// Score shared by every position without an explicit entry.
    pub fn fill(&self) -> f64 {
        self.fill
    }

    /// Score at one position.
    pub fn get(&self, position: usize) -> f64 {
        assert!(position < self.len, "position out of bounds");
        match self
            .entries
            .binary_search_by_key(&position, |entry| entry.position)
        {
            Ok(idx) => self.entries[idx].score,
            Err(_) => self.fill,
        }
    }

    /// Materialize the dense form.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut out = vec![self.fill; self.len];
        for entry in &self.entries {
            out[entry.position] = entry.score;
        }
        out
    }

    /// Overwrite `buf` with the dense form. Prior contents are ignored.
    pub fn densify_into(&self, buf: &mut [f64]) {
        assert_eq!(buf.len(), self.len, "buffer length must match vector length");
        buf.fill(self.fill);
        for entry in &self.entries {
            buf[entry.position] = entry.score;
        }
    }
}

/// One standardized vector held in both representations.
///
/// The strategies each read whichever sides they are specialized for, so a
/// conformance or benchmark run materializes both once up front.
#[derive(Debug, Clone)]
pub struct Standardized {
    dense: Vec<f64>,
    sparse: SparseVector,
}

impl Standardized {
    pub fn from_sparse(sparse: SparseVector) -> Self {
        Self {
            dense: sparse.to_dense(),
            sparse,
        }
    }

    /// Standardize a raw vector (splitting by sign) into both
    /// representations.
    pub fn from_raw(values: &[f64]) -> Self {
        let (negative, positive) = rank::split_by_sign(values);
        Self::from_sparse(SparseVector::standardize_split(
            values.len(),
            &negative,
            &positive,
        ))
    }

    pub fn len(&self) -> usize {
        self.sparse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sparse.is_empty()
    }

    pub fn dense(&self) -> &[f64] {
        &self.dense
    }

    pub fn sparse(&self) -> &SparseVector {
        &self.sparse
    }

    /// Sum of squared scores across the whole vector.
    ///
    /// A fixed property of the standardization: 0.25, or 0 for the
    /// degenerate all-tied case (recognizable by an empty sparse list). The
    /// unstable strategy folds this constant in rather than recomputing it.
    pub fn sum_squares(&self) -> f64 {
        if self.sparse.entries().is_empty() {
            0.0
        } else {
            rank::SCORE_SUM_SQUARES
        }
    }
}

/// Which algorithm computes the squared distance, tagged by the
/// representation pairing it is specialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Elementwise loop over both dense arrays. Correctness baseline.
    DenseDense,
    /// Sparse query merged against the dense reference.
    SparseDense,
    /// Dense query merged against the sparse reference.
    DenseSparse,
    /// Reference densified into scratch, then the dense baseline.
    Densified,
    /// Densified variant storing only deltas from the fill score.
    DensifiedDelta,
    /// Single-pass algebraic expansion. Documented as approximate.
    Unstable,
    /// Two-pointer merge over both sparse lists.
    SparseSparse,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::DenseDense,
        Strategy::SparseDense,
        Strategy::DenseSparse,
        Strategy::Densified,
        Strategy::DensifiedDelta,
        Strategy::Unstable,
        Strategy::SparseSparse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::DenseDense => "dense-dense",
            Strategy::SparseDense => "sparse-dense",
            Strategy::DenseSparse => "dense-sparse",
            Strategy::Densified => "dense-sparse-densified",
            Strategy::DensifiedDelta => "dense-sparse-densified-delta",
            Strategy::Unstable => "dense-sparse-unstable",
            Strategy::SparseSparse => "sparse-sparse",
        }
    }
}

/// Caller-owned scratch for the densifying strategies.
///
/// Allocate once per vector length and reuse across calls; never share one
/// instance across concurrent calls. The full buffer is overwritten on every
/// use; the delta buffer is all zeros between calls.
#[derive(Debug, Clone)]
pub struct Scratch {
    full: Vec<f64>,
    delta: Vec<f64>,
}

impl Scratch {
    pub fn new(len: usize) -> Self {
        Self {
            full: vec![0.0; len],
            delta: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.full.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}

/// Squared Euclidean distance between two standardized vectors, computed
/// with the selected strategy.
pub fn squared_distance(
    query: &Standardized,
    reference: &Standardized,
    strategy: Strategy,
    scratch: &mut Scratch,
) -> f64 {
    assert_eq!(query.len(), reference.len(), "vector lengths must match");
    assert_eq!(
        scratch.len(),
        query.len(),
        "scratch length must match vector length"
    );

    match strategy {
        Strategy::DenseDense => dense::dense_dense(query.dense(), reference.dense()),
        Strategy::SparseDense => sparse::sparse_dense(query.sparse(), reference.dense()),
        Strategy::DenseSparse => sparse::sparse_dense(reference.sparse(), query.dense()),
        Strategy::Densified => {
            sparse::densified(query.dense(), reference.sparse(), &mut scratch.full)
        }
        Strategy::DensifiedDelta => {
            sparse::densified_delta(query.dense(), reference.sparse(), &mut scratch.delta)
        }
        Strategy::Unstable => {
            sparse::unstable(query.dense(), query.sum_squares(), reference.sparse())
        }
        Strategy::SparseSparse => sparse::sparse_sparse(query.sparse(), reference.sparse()),
    }
}

/// Distances from one query to many references, unsorted `(index, distance)`
/// pairs.
pub fn batch_distances(
    query: &Standardized,
    references: &[Standardized],
    strategy: Strategy,
) -> Vec<(usize, f64)> {
    let mut scratch = Scratch::new(query.len());
    references
        .iter()
        .enumerate()
        .map(|(i, reference)| (i, squared_distance(query, reference, strategy, &mut scratch)))
        .collect()
}

/// Parallel batch distance computation using rayon.
///
/// Each worker owns an independent scratch, so no state is shared across
/// concurrent calls.
pub fn batch_distances_parallel(
    query: &Standardized,
    references: &[Standardized],
    strategy: Strategy,
) -> Vec<(usize, f64)> {
    references
        .par_iter()
        .enumerate()
        .map_init(
            || Scratch::new(query.len()),
            |scratch, (i, reference)| (i, squared_distance(query, reference, strategy, scratch)),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_strategies_run() {
        let query = Standardized::from_raw(&[0.0, 1.5, -2.0, 0.0, 0.5]);
        let reference = Standardized::from_raw(&[1.0, 0.0, 0.0, -1.0, 2.0]);
        let mut scratch = Scratch::new(5);

        let baseline = squared_distance(&query, &reference, Strategy::DenseDense, &mut scratch);
        assert!(baseline > 0.0 && baseline.is_finite());

        for strategy in Strategy::ALL {
            let got = squared_distance(&query, &reference, strategy, &mut scratch);
            assert!(
                (got - baseline).abs() / baseline < 1e-8,
                "{} returned {got}, baseline {baseline}",
                strategy.name()
            );
        }
    }

    #[test]
    fn test_sparse_vector_lookup() {
        let v = SparseVector::new(
            4,
            vec![
                SparseScore {
                    position: 2,
                    score: 0.5,
                },
                SparseScore {
                    position: 0,
                    score: -0.5,
                },
            ],
            0.125,
        );
        assert_eq!(v.get(0), -0.5);
        assert_eq!(v.get(1), 0.125);
        assert_eq!(v.get(2), 0.5);
        assert_eq!(v.to_dense(), vec![-0.5, 0.125, 0.5, 0.125]);
    }

    #[test]
    #[should_panic(expected = "duplicate sparse positions")]
    fn test_duplicate_positions_panic() {
        let entry = SparseScore {
            position: 1,
            score: 0.0,
        };
        SparseVector::new(3, vec![entry, entry], 0.0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_sparse_position_bound_panics() {
        SparseVector::new(
            2,
            vec![SparseScore {
                position: 2,
                score: 1.0,
            }],
            0.0,
        );
    }

    #[test]
    fn test_zero_length_distance() {
        let query = Standardized::from_raw(&[]);
        let reference = Standardized::from_raw(&[]);
        let mut scratch = Scratch::new(0);
        for strategy in Strategy::ALL {
            assert_eq!(
                squared_distance(&query, &reference, strategy, &mut scratch),
                0.0,
                "{}",
                strategy.name()
            );
        }
    }

    #[test]
    fn test_batch_parallel_matches_sequential() {
        let query = Standardized::from_raw(&[0.0, 2.0, -1.0, 0.0]);
        let references: Vec<Standardized> = [
            vec![1.0, 0.0, 0.0, -1.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![-3.0, 1.0, 2.0, 0.0],
        ]
        .iter()
        .map(|raw| Standardized::from_raw(raw))
        .collect();

        let sequential = batch_distances(&query, &references, Strategy::SparseSparse);
        let parallel = batch_distances_parallel(&query, &references, Strategy::SparseSparse);
        assert_eq!(sequential, parallel);
    }
}
