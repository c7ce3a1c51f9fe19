//! Tie-aware rank standardization of numeric vectors.

pub mod transform;

pub use transform::{
    collect_sorted, sort_by_value, split_by_sign, standardize, standardize_split,
    standardize_split_with, standardize_with, RankedEntry, SparseScore, SCORE_SUM_SQUARES,
};
