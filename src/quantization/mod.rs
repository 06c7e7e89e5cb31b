//! Vector compression schemes.
//!
//! [`scalar`] holds the stateless min-max quantizers (8-bit and 4-bit);
//! [`pq`] holds the trainable product quantizer. The storage layer picks
//! one per store and routes encode/decode through it.

pub mod pq;
pub mod scalar;

pub use pq::{PqCodebook, PqConfig, PqDistanceTables, PqEncoded, ProductQuantizer};
pub use scalar::{
    dequantize_4bit, dequantize_8bit, quantization_error, quantize_4bit, quantize_8bit,
    QuantizationStats, ScalarBits, ScalarQuantized,
};
