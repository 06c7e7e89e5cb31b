//! Quantized vector store: id-keyed compressed records with metadata.
//!
//! A [`QuantizedStore`] owns one quantizer for its lifetime and routes
//! encode/decode through it per configuration. Search scans every stored
//! record: the product path precomputes a distance table per query and
//! sums code lookups; the scalar path decodes then compares (the
//! baseline contract — scalar quantization has no asymmetric shortcut).
//!
//! All methods are synchronous. The `&self`/`&mut self` borrows encode
//! the single-logical-owner contract: concurrent writers need external
//! mutual exclusion, and a search concurrent with a mutation has no
//! isolation guarantee.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::distance::{l2_norm, normalize, DistanceMetric};
use crate::error::{QuantError, Result};
use crate::quantization::{
    quantize_4bit, quantize_8bit, PqConfig, PqEncoded, ProductQuantizer, ScalarBits,
    ScalarQuantized,
};

/// Which compression scheme a store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantizationKind {
    /// Scalar min-max quantization, one byte per element.
    #[serde(rename = "scalar8bit")]
    Scalar8Bit,
    /// Scalar min-max quantization, one nibble per element.
    #[serde(rename = "scalar4bit")]
    Scalar4Bit,
    /// Product quantization with trained codebooks.
    #[serde(rename = "product")]
    Product,
}

/// Configuration for a [`QuantizedStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Vector dimension shared by every entry.
    pub dimension: usize,
    /// Compression scheme.
    pub quantization: QuantizationKind,
    /// Distance metric for search.
    pub metric: DistanceMetric,
    /// Product-quantization parameters; ignored for scalar schemes.
    #[serde(default)]
    pub pq: PqConfig,
}

impl StoreConfig {
    /// Configuration with default PQ parameters.
    pub fn new(dimension: usize, quantization: QuantizationKind, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            quantization,
            metric,
            pq: PqConfig::default(),
        }
    }

    /// Check limits that apply to every scheme. Product-specific
    /// invariants are enforced by [`ProductQuantizer::new`].
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 || self.dimension > config::MAX_DIMENSION {
            return Err(QuantError::Config(format!(
                "dimension {} out of range 1..={}",
                self.dimension,
                config::MAX_DIMENSION
            )));
        }
        Ok(())
    }
}

/// A typed metadata value attached to an entry.
///
/// The export document keeps serde's default externally-tagged
/// representation, so values round-trip without loss of type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    /// Boolean value (`true` / `false`).
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

/// Arbitrary key-value metadata for an entry.
pub type Metadata = HashMap<String, MetadataValue>;

/// A compressed record in either scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompressedRecord {
    Scalar(ScalarQuantized),
    Product(PqEncoded),
}

/// One stored entry: compressed record, metadata, and the insertion
/// sequence number used for stable tie-breaking in search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoreEntry {
    pub seq: u64,
    pub record: CompressedRecord,
    pub metadata: Option<Metadata>,
}

/// A search result: entry id, similarity score, and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// Similarity per the configured metric: cosine similarity, dot
    /// product, or `1 / (1 + distance)` for L2. Higher is better.
    pub score: f32,
    pub metadata: Option<Metadata>,
}

/// One item of a batch insert.
#[derive(Debug, Clone)]
pub struct InsertItem {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: Option<Metadata>,
}

/// In-memory store of quantized vectors with linear-scan similarity
/// search over the compressed representations.
#[derive(Debug)]
pub struct QuantizedStore {
    pub(crate) config: StoreConfig,
    /// Present iff the scheme is product quantization.
    pub(crate) pq: Option<ProductQuantizer>,
    pub(crate) entries: HashMap<String, StoreEntry>,
    pub(crate) next_seq: u64,
}

impl QuantizedStore {
    /// Create an empty store. For product quantization the quantizer
    /// starts untrained; [`QuantizedStore::train`] must run before the
    /// first insert or search.
    pub fn new(store_config: StoreConfig) -> Result<Self> {
        store_config.validate()?;
        let pq = match store_config.quantization {
            QuantizationKind::Product => Some(ProductQuantizer::new(
                store_config.dimension,
                store_config.pq.clone(),
            )?),
            _ => None,
        };
        Ok(Self {
            config: store_config,
            pq,
            entries: HashMap::new(),
            next_seq: 0,
        })
    }

    /// Rebuild a store from validated snapshot parts.
    pub(crate) fn from_parts(
        store_config: StoreConfig,
        pq: Option<ProductQuantizer>,
        entries: HashMap<String, StoreEntry>,
        next_seq: u64,
    ) -> Self {
        Self {
            config: store_config,
            pq,
            entries,
            next_seq,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether encode and search are ready: always true for scalar
    /// schemes, training-dependent for product quantization.
    pub fn is_trained(&self) -> bool {
        self.pq.as_ref().map_or(true, ProductQuantizer::is_trained)
    }

    /// Compression ratio of the configured scheme relative to f32.
    pub fn compression_ratio(&self) -> f32 {
        match (&self.config.quantization, &self.pq) {
            (QuantizationKind::Scalar8Bit, _) => ScalarBits::Eight.compression_ratio(),
            (QuantizationKind::Scalar4Bit, _) => ScalarBits::Four.compression_ratio(),
            (QuantizationKind::Product, Some(pq)) => pq.compression_ratio(),
            // Config and constructor keep pq in lockstep with the kind.
            (QuantizationKind::Product, None) => unreachable!("product store without quantizer"),
        }
    }

    /// Train the product quantizer on a representative sample. Under the
    /// cosine metric the sample is normalized first, matching what
    /// insert feeds the encoder. A no-op for scalar schemes, which have
    /// no lifecycle.
    pub fn train(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        let Some(pq) = self.pq.as_mut() else {
            tracing::debug!("train called on a scalar store; nothing to do");
            return Ok(());
        };
        if self.config.metric == DistanceMetric::Cosine {
            let mut normalized = vectors.to_vec();
            for v in &mut normalized {
                normalize(v);
            }
            pq.train(&normalized)
        } else {
            pq.train(vectors)
        }
    }

    /// Validate a vector and produce the version fed to the encoder
    /// (unit-normalized under cosine) along with the original norm.
    fn prepare(&self, vector: &[f32]) -> Result<(Vec<f32>, f32)> {
        if vector.len() != self.config.dimension {
            return Err(QuantError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(QuantError::Validation(
                "vector contains non-finite values".to_string(),
            ));
        }
        let norm = l2_norm(vector);
        let mut prepared = vector.to_vec();
        if self.config.metric == DistanceMetric::Cosine {
            normalize(&mut prepared);
        }
        Ok((prepared, norm))
    }

    fn encode(&self, prepared: &[f32], original_norm: f32) -> Result<CompressedRecord> {
        match self.config.quantization {
            QuantizationKind::Scalar8Bit => Ok(CompressedRecord::Scalar(quantize_8bit(prepared)?)),
            QuantizationKind::Scalar4Bit => Ok(CompressedRecord::Scalar(quantize_4bit(prepared)?)),
            QuantizationKind::Product => {
                let pq = self.pq.as_ref().ok_or(QuantError::NotTrained)?;
                let mut encoded = pq.encode(prepared)?;
                // Under cosine the encoder sees the unit vector; the
                // stored norm must still be the original magnitude so
                // decode can rescale.
                encoded.norm = original_norm;
                Ok(CompressedRecord::Product(encoded))
            }
        }
    }

    /// Insert a vector under an id, overwriting any existing entry with
    /// the same id. Validation happens before any mutation.
    pub fn insert(&mut self, id: impl Into<String>, vector: &[f32], metadata: Option<Metadata>) -> Result<()> {
        if let Some(meta) = &metadata {
            if meta.len() > config::MAX_METADATA_KEYS {
                return Err(QuantError::Validation(format!(
                    "metadata has {} keys, maximum is {}",
                    meta.len(),
                    config::MAX_METADATA_KEYS
                )));
            }
        }
        let (prepared, norm) = self.prepare(vector)?;
        let record = self.encode(&prepared, norm)?;

        let id = id.into();
        // Overwrites keep the original insertion sequence so tie order
        // stays stable.
        let seq = match self.entries.get(&id) {
            Some(existing) => existing.seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        self.entries.insert(
            id,
            StoreEntry {
                seq,
                record,
                metadata,
            },
        );
        Ok(())
    }

    /// Insert many items; each succeeds or fails independently with no
    /// rollback. Only an oversized batch fails the call as a whole.
    pub fn insert_batch(&mut self, items: Vec<InsertItem>) -> Result<Vec<Result<()>>> {
        if items.len() > config::MAX_BATCH_SIZE {
            return Err(QuantError::Validation(format!(
                "batch of {} items exceeds maximum {}",
                items.len(),
                config::MAX_BATCH_SIZE
            )));
        }
        Ok(items
            .into_iter()
            .map(|item| self.insert(item.id, &item.vector, item.metadata))
            .collect())
    }

    /// Delete an entry. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Lossy dequantized reconstruction of a stored vector, or `None` if
    /// the id is absent. Product records under cosine are rescaled by
    /// the stored norm; scalar records under cosine reconstruct the unit
    /// direction only.
    pub fn get_vector(&self, id: &str) -> Result<Option<Vec<f32>>> {
        let Some(entry) = self.entries.get(id) else {
            return Ok(None);
        };
        let vector = match &entry.record {
            CompressedRecord::Scalar(record) => record.dequantize()?,
            CompressedRecord::Product(encoded) => {
                let pq = self.pq.as_ref().ok_or(QuantError::NotTrained)?;
                let mut decoded = pq.decode(encoded)?;
                if self.config.metric == DistanceMetric::Cosine {
                    for x in decoded.iter_mut() {
                        *x *= encoded.norm;
                    }
                }
                decoded
            }
        };
        Ok(Some(vector))
    }

    /// Search the `k` most similar entries to `query`.
    ///
    /// Distances are computed directly against the compressed corpus;
    /// `threshold`, when given, filters on similarity before ranking.
    /// Results are ordered by similarity descending with ties broken by
    /// insertion order. An empty store yields an empty Vec.
    pub fn search(&self, query: &[f32], k: usize, threshold: Option<f32>) -> Result<Vec<SearchHit>> {
        if k > config::MAX_K {
            return Err(QuantError::Config(format!(
                "k {} exceeds maximum {}",
                k,
                config::MAX_K
            )));
        }
        let (prepared, query_norm) = self.prepare(query)?;

        let scored = match self.config.quantization {
            QuantizationKind::Product => self.scan_product(&prepared, query_norm)?,
            _ => self.scan_scalar(&prepared)?,
        };

        let mut scored: Vec<(f32, u64, &str)> = match threshold {
            Some(min) => scored.into_iter().filter(|&(sim, _, _)| sim >= min).collect(),
            None => scored,
        };
        scored.sort_by_key(|&(sim, seq, _)| (std::cmp::Reverse(OrderedFloat(sim)), seq));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(sim, _, id)| SearchHit {
                id: id.to_string(),
                score: sim,
                metadata: self.entries[id].metadata.clone(),
            })
            .collect())
    }

    /// Product-path scan: one table build per query, O(S) per record.
    fn scan_product(&self, query: &[f32], query_norm: f32) -> Result<Vec<(f32, u64, &str)>> {
        let pq = self.pq.as_ref().ok_or(QuantError::NotTrained)?;
        // Untrained product search fails here even on an empty store.
        let tables = pq.distance_tables(query)?;
        let metric = self.config.metric;
        let query_norm_sq = query_norm * query_norm;

        self.entries
            .par_iter()
            .map(|(id, entry)| {
                let CompressedRecord::Product(encoded) = &entry.record else {
                    return Err(QuantError::Validation(format!(
                        "entry '{id}' is not product-encoded"
                    )));
                };
                let dist = tables.distance(encoded);
                let sim = match metric {
                    // Both sides are unit vectors: ‖q−x‖² = 2 − 2·cos.
                    DistanceMetric::Cosine => 1.0 - dist / 2.0,
                    DistanceMetric::L2 => 1.0 / (1.0 + dist),
                    // Recover q·x from ‖q−x‖² and the exact stored norm.
                    DistanceMetric::InnerProduct => {
                        (query_norm_sq + encoded.norm * encoded.norm - dist) / 2.0
                    }
                };
                Ok((sim, entry.seq, id.as_str()))
            })
            .collect()
    }

    /// Scalar-path scan: decode each record, then exact metric distance.
    fn scan_scalar(&self, query: &[f32]) -> Result<Vec<(f32, u64, &str)>> {
        let metric = self.config.metric;
        self.entries
            .par_iter()
            .map(|(id, entry)| {
                let CompressedRecord::Scalar(record) = &entry.record else {
                    return Err(QuantError::Validation(format!(
                        "entry '{id}' is not scalar-encoded"
                    )));
                };
                let decoded = record.dequantize()?;
                let dist = metric.distance(query, &decoded);
                Ok((metric.similarity_from_distance(dist), entry.seq, id.as_str()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_config(metric: DistanceMetric) -> StoreConfig {
        StoreConfig::new(4, QuantizationKind::Scalar8Bit, metric)
    }

    fn product_config() -> StoreConfig {
        let mut cfg = StoreConfig::new(4, QuantizationKind::Product, DistanceMetric::L2);
        cfg.pq.num_subspaces = 2;
        cfg.pq.num_centroids = 2;
        cfg
    }

    fn meta_kv(k: &str, v: MetadataValue) -> Metadata {
        let mut m = HashMap::new();
        m.insert(k.to_string(), v);
        m
    }

    #[test]
    fn test_insert_and_count() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        store.insert("a", &[0.0, 0.0, 0.0, 0.0], None).unwrap();
        store.insert("b", &[1.0, 1.0, 1.0, 1.0], None).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains("a"));
        assert!(!store.contains("c"));
    }

    #[test]
    fn test_insert_dimension_mismatch_leaves_store_unchanged() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        store.insert("a", &[0.0, 0.0, 0.0, 0.0], None).unwrap();
        let err = store.insert("b", &[1.0, 2.0], None);
        assert!(matches!(
            err,
            Err(QuantError::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
        assert_eq!(store.len(), 1, "failed insert must not mutate the store");
    }

    #[test]
    fn test_insert_rejects_non_finite() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        let err = store.insert("a", &[0.0, f32::INFINITY, 0.0, 0.0], None);
        assert!(matches!(err, Err(QuantError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_overwrite_same_id() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        store.insert("a", &[0.0, 0.0, 0.0, 0.0], None).unwrap();
        store
            .insert("a", &[1.0, 1.0, 1.0, 1.0], Some(meta_kv("v", MetadataValue::Integer(2))))
            .unwrap();
        assert_eq!(store.len(), 1);
        let v = store.get_vector("a").unwrap().unwrap();
        assert!((v[0] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_scalar_l2_exact_match_scenario() {
        // The exact stored vector must score similarity 1.0 (distance 0).
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        store.insert("zero", &[0.0, 0.0, 0.0, 0.0], None).unwrap();
        store.insert("one", &[1.0, 1.0, 1.0, 1.0], None).unwrap();
        let hits = store.search(&[1.0, 1.0, 1.0, 1.0], 1, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "one");
        assert!((hits[0].score - 1.0).abs() < 1e-6, "got {}", hits[0].score);
    }

    #[test]
    fn test_search_empty_store_returns_empty() {
        let store = QuantizedStore::new(scalar_config(DistanceMetric::Cosine)).unwrap();
        let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 5, None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_threshold_filters_before_ranking() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::Cosine)).unwrap();
        store.insert("near", &[1.0, 0.0, 0.0, 0.0], None).unwrap();
        store.insert("far", &[-1.0, 0.0, 0.0, 0.0], None).unwrap();
        let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 10, Some(0.5)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "near");
    }

    #[test]
    fn test_search_ties_break_by_insertion_order() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        // Identical vectors => identical similarity; order must follow
        // first insertion.
        store.insert("second", &[1.0, 1.0, 1.0, 1.0], None).unwrap();
        store.insert("first", &[1.0, 1.0, 1.0, 1.0], None).unwrap();
        store.insert("third", &[1.0, 1.0, 1.0, 1.0], None).unwrap();
        let hits = store.search(&[1.0, 1.0, 1.0, 1.0], 3, None).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first", "third"]);
    }

    #[test]
    fn test_overwrite_keeps_tie_position() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        store.insert("a", &[1.0, 1.0, 1.0, 1.0], None).unwrap();
        store.insert("b", &[1.0, 1.0, 1.0, 1.0], None).unwrap();
        // Overwriting "a" must not demote it behind "b".
        store.insert("a", &[1.0, 1.0, 1.0, 1.0], None).unwrap();
        let hits = store.search(&[1.0, 1.0, 1.0, 1.0], 2, None).unwrap();
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "b");
    }

    #[test]
    fn test_remove() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        store.insert("a", &[0.5, 0.5, 0.5, 0.5], None).unwrap();
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(store.get_vector("a").unwrap().is_none());
    }

    #[test]
    fn test_get_vector_roundtrip_within_step() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        let v = [0.1, -0.4, 0.9, 0.3];
        store.insert("a", &v, None).unwrap();
        let got = store.get_vector("a").unwrap().unwrap();
        for (orig, deq) in v.iter().zip(got.iter()) {
            assert!((orig - deq).abs() < 0.01);
        }
    }

    #[test]
    fn test_product_store_requires_training() {
        let mut store = QuantizedStore::new(product_config()).unwrap();
        assert!(!store.is_trained());
        let err = store.insert("a", &[0.0, 0.0, 1.0, 1.0], None);
        assert!(matches!(err, Err(QuantError::NotTrained)));
        let err = store.search(&[0.0, 0.0, 1.0, 1.0], 1, None);
        assert!(matches!(err, Err(QuantError::NotTrained)));
    }

    #[test]
    fn test_product_store_search() {
        let mut store = QuantizedStore::new(product_config()).unwrap();
        let training = vec![
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0.1, 0.0, 1.0, 0.9],
            vec![5.0, 5.0, 5.0, 5.0],
            vec![5.1, 4.9, 5.0, 5.0],
        ];
        store.train(&training).unwrap();
        assert!(store.is_trained());

        store.insert("low", &[0.0, 0.0, 1.0, 1.0], None).unwrap();
        store.insert("high", &[5.0, 5.0, 5.0, 5.0], None).unwrap();

        let hits = store.search(&[0.1, 0.1, 1.0, 1.0], 2, None).unwrap();
        assert_eq!(hits[0].id, "low");
        assert_eq!(hits[1].id, "high");
    }

    #[test]
    fn test_product_cosine_rescales_on_decode() {
        let mut cfg = product_config();
        cfg.metric = DistanceMetric::Cosine;
        let mut store = QuantizedStore::new(cfg).unwrap();
        // Directions along two axes; magnitudes differ from unit length.
        store
            .train(&[
                vec![3.0, 0.0, 0.0, 0.0],
                vec![2.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 4.0],
                vec![0.0, 0.0, 0.0, 5.0],
            ])
            .unwrap();
        store.insert("x", &[3.0, 0.0, 0.0, 0.0], None).unwrap();
        let got = store.get_vector("x").unwrap().unwrap();
        assert!(
            (got[0] - 3.0).abs() < 0.1,
            "stored norm should restore magnitude, got {got:?}"
        );
    }

    #[test]
    fn test_inner_product_prefers_larger_dot() {
        let mut store = QuantizedStore::new(StoreConfig::new(
            4,
            QuantizationKind::Scalar8Bit,
            DistanceMetric::InnerProduct,
        ))
        .unwrap();
        store.insert("small", &[0.1, 0.1, 0.0, 0.0], None).unwrap();
        store.insert("large", &[2.0, 2.0, 0.0, 0.0], None).unwrap();
        let hits = store.search(&[1.0, 1.0, 0.0, 0.0], 2, None).unwrap();
        assert_eq!(hits[0].id, "large");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_insert_batch_independent_failures() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        let results = store
            .insert_batch(vec![
                InsertItem {
                    id: "good".into(),
                    vector: vec![1.0, 2.0, 3.0, 4.0],
                    metadata: None,
                },
                InsertItem {
                    id: "bad".into(),
                    vector: vec![1.0],
                    metadata: None,
                },
                InsertItem {
                    id: "also-good".into(),
                    vector: vec![4.0, 3.0, 2.0, 1.0],
                    metadata: None,
                },
            ])
            .unwrap();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_metadata_returned_in_hits() {
        let mut store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        store
            .insert(
                "a",
                &[1.0, 1.0, 1.0, 1.0],
                Some(meta_kv("lang", MetadataValue::String("en".into()))),
            )
            .unwrap();
        let hits = store.search(&[1.0, 1.0, 1.0, 1.0], 1, None).unwrap();
        match hits[0].metadata.as_ref().and_then(|m| m.get("lang")) {
            Some(MetadataValue::String(s)) => assert_eq!(s, "en"),
            other => panic!("expected lang metadata, got {other:?}"),
        }
    }

    #[test]
    fn test_compression_ratios() {
        let store = QuantizedStore::new(scalar_config(DistanceMetric::L2)).unwrap();
        assert_eq!(store.compression_ratio(), 4.0);
        let store = QuantizedStore::new(product_config()).unwrap();
        // (4 * 4) / (2 + 4)
        assert!((store.compression_ratio() - 16.0 / 6.0).abs() < 1e-6);
    }
}
