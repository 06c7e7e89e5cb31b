//! Error types for quantdb.
//!
//! Every fallible operation returns [`QuantError`]. Errors are raised
//! synchronously at the offending call, before any mutation of store or
//! quantizer state.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, QuantError>;

/// Unified error type for configuration, training, and validation failures.
#[derive(Debug, Error)]
pub enum QuantError {
    /// Invalid or inconsistent configuration: dimension not divisible by
    /// the subspace count, centroid count outside 1..=256, unknown
    /// quantization type, limit violations.
    #[error("configuration error: {0}")]
    Config(String),

    /// Encode, decode, or search attempted on a product quantizer before
    /// `train` has been called.
    #[error("product quantizer has not been trained")]
    NotTrained,

    /// A vector's length does not match the configured dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store or quantizer was configured with.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// Malformed input: schema-violating import documents, non-finite
    /// vector elements, empty inputs.
    #[error("validation error: {0}")]
    Validation(String),
}
