//! RankDist - rank-based standardization and sparse squared-L2 distances
//!
//! This library converts raw numeric vectors into tie-aware, variance-
//! normalized rank scores and computes squared Euclidean distances between
//! such vectors through a family of algebraically equivalent strategies,
//! one per sparsity-representation pairing.

pub mod conformance;
pub mod distance;
pub mod rank;

// Re-export commonly used types
pub use conformance::{check_strategies, ConformanceReport, RELATIVE_TOLERANCE};
pub use distance::{
    batch_distances, batch_distances_parallel, squared_distance, Scratch, SparseVector,
    Standardized, Strategy,
};
pub use rank::{
    collect_sorted, split_by_sign, standardize, standardize_split, standardize_split_with,
    standardize_with, RankedEntry, SparseScore,
};
