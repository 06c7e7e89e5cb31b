//! Global configuration constants for quantdb.
//!
//! Tuning parameters and input validation limits are defined here.
//! Per-store runtime configuration lives in [`crate::storage::StoreConfig`].

/// Maximum allowed vector dimension.
pub const MAX_DIMENSION: usize = 4096;

/// Maximum number of results (`k`) per search request.
pub const MAX_K: usize = 10_000;

/// Maximum number of items per batch insert.
pub const MAX_BATCH_SIZE: usize = 1_000;

/// Maximum number of metadata keys per entry.
pub const MAX_METADATA_KEYS: usize = 64;

/// Hard upper bound on centroids per subspace: a PQ code must fit in one byte.
pub const PQ_MAX_CENTROIDS: usize = 256;

/// Default number of PQ subspaces.
pub const PQ_DEFAULT_SUBSPACES: usize = 8;

/// Default number of centroids per subspace.
pub const PQ_DEFAULT_CENTROIDS: usize = 256;

/// Default cap on Lloyd's iterations during PQ training.
///
/// K-means on embedding subspaces converges quickly; 25 iterations is
/// enough in practice and bounds training latency.
pub const PQ_DEFAULT_MAX_ITERATIONS: usize = 25;

/// Default convergence threshold for PQ training.
///
/// Training stops early once the maximum centroid movement in an
/// iteration drops below this value.
pub const PQ_DEFAULT_CONVERGENCE: f32 = 1e-4;

/// Default seed for k-means++ initialization.
///
/// Training is deterministic for a fixed seed and training set.
pub const PQ_DEFAULT_SEED: u64 = 0;
