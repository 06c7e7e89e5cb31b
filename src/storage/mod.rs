//! Storage layer: the quantized vector store and its snapshot format.

pub mod snapshot;
pub mod store;

pub use store::{
    CompressedRecord, InsertItem, Metadata, MetadataValue, QuantizationKind, QuantizedStore,
    SearchHit, StoreConfig,
};
