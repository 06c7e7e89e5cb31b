//! # quantdb
//!
//! Embeddable vector quantization and approximate nearest neighbor
//! search engine. Dense f32 vectors are compressed to compact byte
//! representations — scalar 8-bit, scalar 4-bit, or product quantization
//! with trained codebooks — and similarity queries run directly against
//! the compressed data via asymmetric distance, without decompressing
//! the corpus.
//!
//! This is a synchronous, single-owner library crate with no I/O:
//! persistence beyond the JSON export/import contract, index structures,
//! and service wrappers are left to embedding applications.

/// Global configuration constants: limits, defaults, and tuning parameters.
pub mod config;
/// Distance metrics: cosine, squared euclidean, and inner product kernels.
pub mod distance;
/// Typed error taxonomy and crate-wide `Result` alias.
pub mod error;
/// Vector compression: scalar min-max quantization and product quantization.
pub mod quantization;
/// Storage layer: the quantized vector store and snapshot export/import.
pub mod storage;

pub use distance::DistanceMetric;
pub use error::{QuantError, Result};
pub use quantization::{PqConfig, ProductQuantizer};
pub use storage::{
    InsertItem, Metadata, MetadataValue, QuantizationKind, QuantizedStore, SearchHit, StoreConfig,
};
