//! Export/import of full store state as a structured JSON document.
//!
//! The document carries the configuration, the trained codebooks when
//! present, and every entry in insertion order, plus a CRC32 checksum
//! over ids and compressed payloads. Import deserializes into
//! `deny_unknown_fields` types (unexpected keys or wrong types are
//! rejected outright), verifies the checksum, then validates every
//! field against the configuration before constructing a store —
//! a malformed or adversarial document never reaches internal
//! structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::distance::DistanceMetric;
use crate::error::{QuantError, Result};
use crate::quantization::{PqCodebook, PqConfig, ProductQuantizer, ScalarBits};
use crate::storage::store::{
    CompressedRecord, Metadata, QuantizationKind, QuantizedStore, StoreConfig, StoreEntry,
};

/// Bumped on breaking changes to the document layout.
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotDocument {
    format_version: u32,
    dimension: usize,
    quantization: QuantizationKind,
    metric: DistanceMetric,
    /// Present only for product-quantized stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pq: Option<PqSnapshot>,
    /// Entries in insertion order; their position becomes the rebuilt
    /// store's tie-break order.
    entries: Vec<EntrySnapshot>,
    /// CRC32 over ids and compressed payloads in entry order. Absent in
    /// hand-written documents; verified when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checksum: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PqSnapshot {
    config: PqConfig,
    /// None for a store exported before training.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    codebook: Option<PqCodebook>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntrySnapshot {
    id: String,
    record: CompressedRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
}

/// CRC32 over ids and compressed payloads, independent of JSON
/// formatting and metadata map order.
fn entries_checksum(entries: &[EntrySnapshot]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for entry in entries {
        hasher.update(&(entry.id.len() as u64).to_le_bytes());
        hasher.update(entry.id.as_bytes());
        match &entry.record {
            CompressedRecord::Scalar(r) => {
                let bits_tag = match r.bits {
                    ScalarBits::Eight => 8u8,
                    ScalarBits::Four => 4u8,
                };
                hasher.update(&[0u8, bits_tag]);
                hasher.update(&(r.dim as u64).to_le_bytes());
                hasher.update(&r.min.to_le_bytes());
                hasher.update(&r.max.to_le_bytes());
                hasher.update(&r.data);
            }
            CompressedRecord::Product(e) => {
                hasher.update(&[1u8]);
                hasher.update(&e.norm.to_le_bytes());
                hasher.update(&e.codes);
            }
        }
    }
    hasher.finalize()
}

fn validation(msg: impl Into<String>) -> QuantError {
    QuantError::Validation(msg.into())
}

impl QuantizedStore {
    /// Serialize the full store state to a JSON document.
    ///
    /// Round-tripping through [`QuantizedStore::import`] reproduces
    /// identical search rankings for any fixed query set.
    pub fn export(&self) -> Result<String> {
        let mut ordered: Vec<(&String, &StoreEntry)> = self.entries.iter().collect();
        ordered.sort_by_key(|(_, entry)| entry.seq);

        let entries: Vec<EntrySnapshot> = ordered
            .into_iter()
            .map(|(id, entry)| EntrySnapshot {
                id: id.clone(),
                record: entry.record.clone(),
                metadata: entry.metadata.clone(),
            })
            .collect();

        let pq = self.pq.as_ref().map(|pq| PqSnapshot {
            config: pq.config().clone(),
            codebook: pq.codebook().cloned(),
        });

        let document = SnapshotDocument {
            format_version: FORMAT_VERSION,
            dimension: self.config.dimension,
            quantization: self.config.quantization,
            metric: self.config.metric,
            pq,
            checksum: Some(entries_checksum(&entries)),
            entries,
        };

        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| validation(format!("failed to serialize snapshot: {e}")))?;
        tracing::info!(
            entries = document.entries.len(),
            bytes = text.len(),
            "exported store snapshot"
        );
        Ok(text)
    }

    /// Reconstruct a store from a document produced by
    /// [`QuantizedStore::export`].
    ///
    /// The document's shape is validated against the expected schema
    /// before any field is trusted: unknown keys, wrong types, checksum
    /// mismatches, and records inconsistent with the configuration are
    /// all rejected with [`QuantError::Validation`].
    pub fn import(data: &str) -> Result<QuantizedStore> {
        let document: SnapshotDocument = serde_json::from_str(data)
            .map_err(|e| validation(format!("malformed snapshot document: {e}")))?;

        if document.format_version != FORMAT_VERSION {
            return Err(validation(format!(
                "unsupported snapshot format version {}",
                document.format_version
            )));
        }

        match document.checksum {
            Some(expected) => {
                let computed = entries_checksum(&document.entries);
                if computed != expected {
                    return Err(validation(format!(
                        "snapshot checksum mismatch: expected {expected:#010x}, got {computed:#010x}"
                    )));
                }
            }
            None => {
                tracing::warn!("snapshot document has no checksum; skipping verification");
            }
        }

        let store_config = StoreConfig {
            dimension: document.dimension,
            quantization: document.quantization,
            metric: document.metric,
            pq: document
                .pq
                .as_ref()
                .map(|p| p.config.clone())
                .unwrap_or_default(),
        };
        store_config.validate()?;

        let pq = match document.quantization {
            QuantizationKind::Product => {
                let snapshot = document
                    .pq
                    .ok_or_else(|| validation("product store snapshot is missing the pq section"))?;
                if snapshot.codebook.is_none() && !document.entries.is_empty() {
                    return Err(validation(
                        "snapshot has product-encoded entries but no codebook",
                    ));
                }
                Some(ProductQuantizer::from_parts(
                    document.dimension,
                    snapshot.config,
                    snapshot.codebook,
                )?)
            }
            _ => {
                if document.pq.is_some() {
                    return Err(validation("scalar store snapshot carries a pq section"));
                }
                None
            }
        };

        let mut entries: HashMap<String, StoreEntry> =
            HashMap::with_capacity(document.entries.len());
        for (seq, entry) in document.entries.into_iter().enumerate() {
            validate_entry(&entry, &store_config)?;
            if entries
                .insert(
                    entry.id.clone(),
                    StoreEntry {
                        seq: seq as u64,
                        record: entry.record,
                        metadata: entry.metadata,
                    },
                )
                .is_some()
            {
                return Err(validation(format!("duplicate entry id '{}'", entry.id)));
            }
        }

        let next_seq = entries.len() as u64;
        tracing::info!(entries = entries.len(), "imported store snapshot");
        Ok(QuantizedStore::from_parts(store_config, pq, entries, next_seq))
    }
}

fn validate_entry(entry: &EntrySnapshot, store_config: &StoreConfig) -> Result<()> {
    if entry.id.is_empty() {
        return Err(validation("entry id must not be empty"));
    }
    if let Some(meta) = &entry.metadata {
        if meta.len() > config::MAX_METADATA_KEYS {
            return Err(validation(format!(
                "entry '{}' has {} metadata keys, maximum is {}",
                entry.id,
                meta.len(),
                config::MAX_METADATA_KEYS
            )));
        }
    }

    match (&entry.record, store_config.quantization) {
        (CompressedRecord::Scalar(r), QuantizationKind::Scalar8Bit) => {
            validate_scalar_record(&entry.id, r, store_config.dimension, ScalarBits::Eight)
        }
        (CompressedRecord::Scalar(r), QuantizationKind::Scalar4Bit) => {
            validate_scalar_record(&entry.id, r, store_config.dimension, ScalarBits::Four)
        }
        (CompressedRecord::Product(e), QuantizationKind::Product) => {
            if e.codes.len() != store_config.pq.num_subspaces {
                return Err(validation(format!(
                    "entry '{}' has {} codes, expected {}",
                    entry.id,
                    e.codes.len(),
                    store_config.pq.num_subspaces
                )));
            }
            if let Some(&code) = e
                .codes
                .iter()
                .find(|&&c| c as usize >= store_config.pq.num_centroids)
            {
                return Err(validation(format!(
                    "entry '{}' references centroid {code}, codebook has {}",
                    entry.id, store_config.pq.num_centroids
                )));
            }
            if !e.norm.is_finite() || e.norm < 0.0 {
                return Err(validation(format!(
                    "entry '{}' has invalid norm {}",
                    entry.id, e.norm
                )));
            }
            Ok(())
        }
        _ => Err(validation(format!(
            "entry '{}' record kind does not match store quantization type",
            entry.id
        ))),
    }
}

fn validate_scalar_record(
    id: &str,
    record: &crate::quantization::ScalarQuantized,
    dimension: usize,
    expected_bits: ScalarBits,
) -> Result<()> {
    if record.bits != expected_bits {
        return Err(validation(format!(
            "entry '{id}' bit width does not match store quantization type"
        )));
    }
    if record.dim != dimension {
        return Err(validation(format!(
            "entry '{id}' has dimension {}, store expects {dimension}",
            record.dim
        )));
    }
    let expected_len = match expected_bits {
        ScalarBits::Eight => dimension,
        ScalarBits::Four => dimension.div_ceil(2),
    };
    if record.data.len() != expected_len {
        return Err(validation(format!(
            "entry '{id}' has {} data bytes, expected {expected_len}",
            record.data.len()
        )));
    }
    if !record.min.is_finite() || !record.max.is_finite() || record.min > record.max {
        return Err(validation(format!(
            "entry '{id}' has invalid range [{}, {}]",
            record.min, record.max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::{InsertItem, SearchHit};

    fn populated_scalar_store() -> QuantizedStore {
        let mut store = QuantizedStore::new(StoreConfig::new(
            4,
            QuantizationKind::Scalar8Bit,
            DistanceMetric::Cosine,
        ))
        .unwrap();
        let items: Vec<InsertItem> = (0..8)
            .map(|i| InsertItem {
                id: format!("doc-{i}"),
                vector: vec![
                    (i as f32 * 0.37).sin(),
                    (i as f32 * 0.91).cos(),
                    i as f32 * 0.1,
                    1.0 - i as f32 * 0.05,
                ],
                metadata: None,
            })
            .collect();
        for r in store.insert_batch(items).unwrap() {
            r.unwrap();
        }
        store
    }

    fn top_ids(hits: &[SearchHit]) -> Vec<String> {
        hits.iter().map(|h| h.id.clone()).collect()
    }

    #[test]
    fn test_roundtrip_preserves_rankings() {
        let store = populated_scalar_store();
        let query = [0.3, 0.6, 0.2, 0.9];
        let before = store.search(&query, 5, None).unwrap();

        let text = store.export().unwrap();
        let restored = QuantizedStore::import(&text).unwrap();
        let after = restored.search(&query, 5, None).unwrap();

        assert_eq!(top_ids(&before), top_ids(&after));
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.score, b.score);
        }
    }

    #[test]
    fn test_roundtrip_product_store() {
        let mut cfg = StoreConfig::new(4, QuantizationKind::Product, DistanceMetric::L2);
        cfg.pq.num_subspaces = 2;
        cfg.pq.num_centroids = 4;
        let mut store = QuantizedStore::new(cfg).unwrap();
        let training: Vec<Vec<f32>> = (0..16)
            .map(|i| vec![i as f32, (i % 4) as f32, 16.0 - i as f32, (i % 3) as f32])
            .collect();
        store.train(&training).unwrap();
        for (i, v) in training.iter().take(8).enumerate() {
            store.insert(format!("v{i}"), v, None).unwrap();
        }

        let query = [3.0, 1.0, 13.0, 0.0];
        let before = store.search(&query, 5, None).unwrap();
        let restored = QuantizedStore::import(&store.export().unwrap()).unwrap();
        let after = restored.search(&query, 5, None).unwrap();
        assert_eq!(top_ids(&before), top_ids(&after));
    }

    #[test]
    fn test_import_rejects_unknown_keys() {
        let store = populated_scalar_store();
        let mut value: serde_json::Value = serde_json::from_str(&store.export().unwrap()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .insert("injected".to_string(), serde_json::json!(true));
        let err = QuantizedStore::import(&value.to_string());
        assert!(matches!(err, Err(QuantError::Validation(_))));
    }

    #[test]
    fn test_import_rejects_wrong_types() {
        let store = populated_scalar_store();
        let mut value: serde_json::Value = serde_json::from_str(&store.export().unwrap()).unwrap();
        value["dimension"] = serde_json::json!("four");
        let err = QuantizedStore::import(&value.to_string());
        assert!(matches!(err, Err(QuantError::Validation(_))));
    }

    #[test]
    fn test_import_rejects_tampered_entries() {
        let store = populated_scalar_store();
        let mut value: serde_json::Value = serde_json::from_str(&store.export().unwrap()).unwrap();
        // Flip one code byte; the checksum no longer matches.
        value["entries"][0]["record"]["Scalar"]["data"][0] = serde_json::json!(255);
        let err = QuantizedStore::import(&value.to_string());
        assert!(matches!(err, Err(QuantError::Validation(_))));
    }

    #[test]
    fn test_import_accepts_missing_checksum_with_warning() {
        let store = populated_scalar_store();
        let mut value: serde_json::Value = serde_json::from_str(&store.export().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("checksum");
        let restored = QuantizedStore::import(&value.to_string()).unwrap();
        assert_eq!(restored.len(), store.len());
    }

    #[test]
    fn test_import_rejects_record_kind_mismatch() {
        let store = populated_scalar_store();
        let mut value: serde_json::Value = serde_json::from_str(&store.export().unwrap()).unwrap();
        value["quantization"] = serde_json::json!("product");
        let err = QuantizedStore::import(&value.to_string());
        assert!(matches!(err, Err(QuantError::Validation(_))));
    }

    #[test]
    fn test_import_rejects_duplicate_ids() {
        let store = populated_scalar_store();
        let mut value: serde_json::Value = serde_json::from_str(&store.export().unwrap()).unwrap();
        let first = value["entries"][0].clone();
        value["entries"]
            .as_array_mut()
            .unwrap()
            .push(first);
        let err = QuantizedStore::import(&value.to_string());
        assert!(matches!(err, Err(QuantError::Validation(_))));
    }

    #[test]
    fn test_import_garbage_is_validation_error() {
        let err = QuantizedStore::import("not even json");
        assert!(matches!(err, Err(QuantError::Validation(_))));
    }

    #[test]
    fn test_export_before_training_roundtrips() {
        let mut cfg = StoreConfig::new(4, QuantizationKind::Product, DistanceMetric::L2);
        cfg.pq.num_subspaces = 2;
        let store = QuantizedStore::new(cfg).unwrap();
        let restored = QuantizedStore::import(&store.export().unwrap()).unwrap();
        assert!(!restored.is_trained());
        assert!(restored.is_empty());
    }
}
