//! Product Quantization (PQ) for fast approximate distance computation.
//!
//! Splits vectors into S subspaces and learns C centroids per subspace
//! via k-means (k-means++ seeding, Lloyd's iterations). Each vector is
//! encoded as S bytes (one centroid index per subspace) plus its original
//! L2 norm. Query-time distance computation uses a precomputed lookup
//! table: S table lookups and additions instead of D multiply-adds.
//!
//! Training is deterministic for a fixed seed: each subspace derives its
//! own random stream from the injected seed, so the rayon-parallel
//! per-subspace runs produce identical codebooks regardless of schedule.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::distance::{euclidean_sq_f32, l2_norm};
use crate::error::{QuantError, Result};

/// Training parameters for a product quantizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PqConfig {
    /// Number of subspaces (S). Must divide the vector dimension evenly.
    pub num_subspaces: usize,
    /// Centroids per subspace (C). At most 256 so a code fits one byte.
    pub num_centroids: usize,
    /// Cap on Lloyd's iterations per subspace.
    pub max_iterations: usize,
    /// Training stops early once the maximum centroid movement in an
    /// iteration drops below this value.
    pub convergence_threshold: f32,
    /// Seed for k-means++ initialization. Same seed + same training set
    /// = same codebooks.
    pub seed: u64,
}

impl Default for PqConfig {
    fn default() -> Self {
        Self {
            num_subspaces: config::PQ_DEFAULT_SUBSPACES,
            num_centroids: config::PQ_DEFAULT_CENTROIDS,
            max_iterations: config::PQ_DEFAULT_MAX_ITERATIONS,
            convergence_threshold: config::PQ_DEFAULT_CONVERGENCE,
            seed: config::PQ_DEFAULT_SEED,
        }
    }
}

/// Trained codebooks: S subspaces × C centroids × sub_dim floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PqCodebook {
    pub num_subspaces: usize,
    pub num_centroids: usize,
    pub sub_dim: usize,
    /// Flat centroid arena: `centroids[(sub * C + c) * sub_dim ..][..sub_dim]`.
    pub centroids: Vec<f32>,
}

impl PqCodebook {
    /// Borrow centroid `c` of subspace `sub`.
    #[inline]
    fn centroid(&self, sub: usize, c: usize) -> &[f32] {
        let start = (sub * self.num_centroids + c) * self.sub_dim;
        &self.centroids[start..start + self.sub_dim]
    }
}

/// A PQ-encoded vector: one centroid index per subspace plus the
/// original vector's Euclidean norm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PqEncoded {
    pub codes: Vec<u8>,
    pub norm: f32,
}

/// Precomputed distance table for a single query: S×C partial distances.
///
/// Entry `[s][c]` is the squared distance from the query's s-th subspace
/// slice to centroid c of subspace s. Converts repeated asymmetric
/// distance calls from O(S·sub_dim) to O(S) per stored vector.
#[derive(Debug, Clone)]
pub struct PqDistanceTables {
    table: Vec<f32>,
    num_subspaces: usize,
    num_centroids: usize,
}

impl PqDistanceTables {
    /// Approximate squared distance for an encoded vector: sums
    /// `table[s][codes[s]]` across subspaces. Equals
    /// [`ProductQuantizer::asymmetric_distance`] exactly for the same
    /// query and record.
    #[inline]
    pub fn distance(&self, encoded: &PqEncoded) -> f32 {
        debug_assert_eq!(encoded.codes.len(), self.num_subspaces);
        let mut dist = 0.0f32;
        for (s, &code) in encoded.codes.iter().enumerate() {
            dist += self.table[s * self.num_centroids + code as usize];
        }
        dist
    }
}

/// A trainable product quantizer.
///
/// Begins untrained; [`ProductQuantizer::train`] fixes the codebooks and
/// every later `train` call replaces them wholesale. Encode, decode, and
/// distance methods fail with [`QuantError::NotTrained`] until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductQuantizer {
    dimension: usize,
    config: PqConfig,
    codebook: Option<PqCodebook>,
}

impl ProductQuantizer {
    /// Create an untrained quantizer, validating the configuration.
    pub fn new(dimension: usize, pq_config: PqConfig) -> Result<Self> {
        if dimension == 0 || dimension > config::MAX_DIMENSION {
            return Err(QuantError::Config(format!(
                "dimension {dimension} out of range 1..={}",
                config::MAX_DIMENSION
            )));
        }
        if pq_config.num_subspaces == 0 {
            return Err(QuantError::Config(
                "num_subspaces must be at least 1".to_string(),
            ));
        }
        if dimension % pq_config.num_subspaces != 0 {
            return Err(QuantError::Config(format!(
                "dimension {dimension} is not divisible by num_subspaces {}",
                pq_config.num_subspaces
            )));
        }
        if pq_config.num_centroids == 0 || pq_config.num_centroids > config::PQ_MAX_CENTROIDS {
            return Err(QuantError::Config(format!(
                "num_centroids {} out of range 1..={}",
                pq_config.num_centroids,
                config::PQ_MAX_CENTROIDS
            )));
        }
        if !pq_config.convergence_threshold.is_finite() || pq_config.convergence_threshold < 0.0 {
            return Err(QuantError::Config(format!(
                "convergence_threshold {} must be finite and non-negative",
                pq_config.convergence_threshold
            )));
        }
        Ok(Self {
            dimension,
            config: pq_config,
            codebook: None,
        })
    }

    /// Rebuild a quantizer from snapshot parts, re-checking invariants.
    pub(crate) fn from_parts(
        dimension: usize,
        pq_config: PqConfig,
        codebook: Option<PqCodebook>,
    ) -> Result<Self> {
        let mut pq = Self::new(dimension, pq_config)?;
        if let Some(cb) = codebook {
            let sub_dim = dimension / pq.config.num_subspaces;
            if cb.num_subspaces != pq.config.num_subspaces
                || cb.num_centroids != pq.config.num_centroids
                || cb.sub_dim != sub_dim
            {
                return Err(QuantError::Validation(format!(
                    "codebook shape {}x{}x{} does not match configuration {}x{}x{}",
                    cb.num_subspaces,
                    cb.num_centroids,
                    cb.sub_dim,
                    pq.config.num_subspaces,
                    pq.config.num_centroids,
                    sub_dim
                )));
            }
            let expected = cb.num_subspaces * cb.num_centroids * cb.sub_dim;
            if cb.centroids.len() != expected {
                return Err(QuantError::Validation(format!(
                    "codebook has {} floats, expected {expected}",
                    cb.centroids.len()
                )));
            }
            if cb.centroids.iter().any(|x| !x.is_finite()) {
                return Err(QuantError::Validation(
                    "codebook contains non-finite centroids".to_string(),
                ));
            }
            pq.codebook = Some(cb);
        }
        Ok(pq)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn config(&self) -> &PqConfig {
        &self.config
    }

    pub fn sub_dim(&self) -> usize {
        self.dimension / self.config.num_subspaces
    }

    pub fn is_trained(&self) -> bool {
        self.codebook.is_some()
    }

    /// Borrow the trained codebook, if any.
    pub fn codebook(&self) -> Option<&PqCodebook> {
        self.codebook.as_ref()
    }

    fn trained(&self) -> Result<&PqCodebook> {
        self.codebook.as_ref().ok_or(QuantError::NotTrained)
    }

    /// Compression ratio relative to f32 storage: `(D × 4) / (S + 4)`
    /// (S code bytes plus 4 bytes for the stored norm).
    pub fn compression_ratio(&self) -> f32 {
        (self.dimension * 4) as f32 / (self.config.num_subspaces + 4) as f32
    }

    /// Train codebooks on a representative sample of vectors.
    ///
    /// Subspaces are independent and trained in parallel. On success the
    /// quantizer transitions to trained, replacing any previous
    /// codebooks.
    pub fn train(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if vectors.is_empty() {
            return Err(QuantError::Validation(
                "training requires at least one vector".to_string(),
            ));
        }
        for v in vectors {
            if v.len() != self.dimension {
                return Err(QuantError::DimensionMismatch {
                    expected: self.dimension,
                    actual: v.len(),
                });
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(QuantError::Validation(
                    "training vectors must contain only finite values".to_string(),
                ));
            }
        }

        let s = self.config.num_subspaces;
        let c = self.config.num_centroids;
        let sub_dim = self.sub_dim();
        let n = vectors.len();

        let per_subspace: Vec<Vec<f32>> = (0..s)
            .into_par_iter()
            .map(|sub| {
                // Extract this subspace's slice from every training vector
                // into a contiguous arena for the k-means inner loop.
                let mut sub_vectors = Vec::with_capacity(n * sub_dim);
                for v in vectors {
                    sub_vectors.extend_from_slice(&v[sub * sub_dim..(sub + 1) * sub_dim]);
                }
                kmeans(
                    &sub_vectors,
                    sub_dim,
                    c,
                    self.config.max_iterations,
                    self.config.convergence_threshold,
                    self.config.seed.wrapping_add(sub as u64),
                )
            })
            .collect();

        let mut centroids = Vec::with_capacity(s * c * sub_dim);
        for sub_centroids in per_subspace {
            centroids.extend_from_slice(&sub_centroids);
        }

        self.codebook = Some(PqCodebook {
            num_subspaces: s,
            num_centroids: c,
            sub_dim,
            centroids,
        });

        tracing::info!(
            subspaces = s,
            centroids = c,
            training_vectors = n,
            "trained product quantizer"
        );
        Ok(())
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension {
            return Err(QuantError::DimensionMismatch {
                expected: self.dimension,
                actual: len,
            });
        }
        Ok(())
    }

    /// Encode a vector as one centroid index per subspace plus its norm.
    pub fn encode(&self, vector: &[f32]) -> Result<PqEncoded> {
        let cb = self.trained()?;
        self.check_dimension(vector.len())?;

        let mut codes = Vec::with_capacity(cb.num_subspaces);
        for sub in 0..cb.num_subspaces {
            let sub_vec = &vector[sub * cb.sub_dim..(sub + 1) * cb.sub_dim];
            let mut best = 0u8;
            let mut best_dist = f32::MAX;
            for c in 0..cb.num_centroids {
                let dist = euclidean_sq_f32(sub_vec, cb.centroid(sub, c));
                if dist < best_dist {
                    best_dist = dist;
                    best = c as u8;
                }
            }
            codes.push(best);
        }

        Ok(PqEncoded {
            codes,
            norm: l2_norm(vector),
        })
    }

    fn check_codes(&self, cb: &PqCodebook, encoded: &PqEncoded) -> Result<()> {
        if encoded.codes.len() != cb.num_subspaces {
            return Err(QuantError::Validation(format!(
                "encoded record has {} codes, expected {}",
                encoded.codes.len(),
                cb.num_subspaces
            )));
        }
        Ok(())
    }

    /// Lossy reconstruction: concatenates the selected centroids. Never
    /// recovers the exact vector.
    pub fn decode(&self, encoded: &PqEncoded) -> Result<Vec<f32>> {
        let cb = self.trained()?;
        self.check_codes(cb, encoded)?;

        let mut out = Vec::with_capacity(self.dimension);
        for (sub, &code) in encoded.codes.iter().enumerate() {
            out.extend_from_slice(cb.centroid(sub, code as usize));
        }
        Ok(out)
    }

    /// Squared distance between a full-precision query and an encoded
    /// vector: the query is sliced per subspace and compared against each
    /// selected centroid. The query side carries no quantization error,
    /// which makes this a closer approximation to the true distance than
    /// comparing two quantized vectors.
    pub fn asymmetric_distance(&self, query: &[f32], encoded: &PqEncoded) -> Result<f32> {
        let cb = self.trained()?;
        self.check_dimension(query.len())?;
        self.check_codes(cb, encoded)?;

        let mut dist = 0.0f32;
        for (sub, &code) in encoded.codes.iter().enumerate() {
            let q_sub = &query[sub * cb.sub_dim..(sub + 1) * cb.sub_dim];
            dist += euclidean_sq_f32(q_sub, cb.centroid(sub, code as usize));
        }
        Ok(dist)
    }

    /// Precompute the S×C table of squared distances from a query to
    /// every centroid. O(S·C·sub_dim) upfront; afterwards each stored
    /// vector costs O(S) via [`PqDistanceTables::distance`]. Essential
    /// when scanning a large corpus for one query.
    pub fn distance_tables(&self, query: &[f32]) -> Result<PqDistanceTables> {
        let cb = self.trained()?;
        self.check_dimension(query.len())?;

        let mut table = vec![0.0f32; cb.num_subspaces * cb.num_centroids];
        for sub in 0..cb.num_subspaces {
            let q_sub = &query[sub * cb.sub_dim..(sub + 1) * cb.sub_dim];
            let row = sub * cb.num_centroids;
            for c in 0..cb.num_centroids {
                table[row + c] = euclidean_sq_f32(q_sub, cb.centroid(sub, c));
            }
        }

        Ok(PqDistanceTables {
            table,
            num_subspaces: cb.num_subspaces,
            num_centroids: cb.num_centroids,
        })
    }
}

/// K-means with k-means++ initialization over a contiguous point arena.
/// Returns k × sub_dim centroids as a flat Vec<f32>.
fn kmeans(
    data: &[f32],
    sub_dim: usize,
    k: usize,
    max_iterations: usize,
    convergence_threshold: f32,
    seed: u64,
) -> Vec<f32> {
    let n = data.len() / sub_dim;
    let mut rng = StdRng::seed_from_u64(seed);

    if n <= k {
        // Fewer points than centroids: each point is its own centroid,
        // the remainder stay zero.
        let mut centroids = vec![0.0f32; k * sub_dim];
        centroids[..n * sub_dim].copy_from_slice(data);
        return centroids;
    }

    let point = |i: usize| &data[i * sub_dim..(i + 1) * sub_dim];

    // K-means++ initialization: first centroid uniform, then weighted by
    // squared distance to the nearest already-chosen centroid.
    let mut centroids = vec![0.0f32; k * sub_dim];
    let first = rng.gen_range(0..n);
    centroids[..sub_dim].copy_from_slice(point(first));

    let mut min_dists = vec![f32::MAX; n];
    for ci in 1..k {
        let last = centroids[(ci - 1) * sub_dim..ci * sub_dim].to_vec();
        let mut total = 0.0f64;
        for i in 0..n {
            let d = euclidean_sq_f32(point(i), &last);
            if d < min_dists[i] {
                min_dists[i] = d;
            }
            total += min_dists[i] as f64;
        }

        let chosen = if total < 1e-30 {
            // All points coincide with existing centroids.
            rng.gen_range(0..n)
        } else {
            let threshold = rng.gen::<f64>() * total;
            let mut cumulative = 0.0f64;
            let mut chosen = n - 1;
            for (i, &d) in min_dists.iter().enumerate() {
                cumulative += d as f64;
                if cumulative >= threshold {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        centroids[ci * sub_dim..(ci + 1) * sub_dim].copy_from_slice(point(chosen));
    }

    // Lloyd's iterations: assign, recompute, stop on max movement below
    // the threshold or on the iteration cap.
    let mut assignments = vec![0usize; n];
    for iteration in 0..max_iterations {
        for i in 0..n {
            let mut best = 0usize;
            let mut best_dist = f32::MAX;
            for c in 0..k {
                let d = euclidean_sq_f32(point(i), &centroids[c * sub_dim..(c + 1) * sub_dim]);
                if d < best_dist {
                    best_dist = d;
                    best = c;
                }
            }
            assignments[i] = best;
        }

        let mut sums = vec![0.0f32; k * sub_dim];
        let mut counts = vec![0u32; k];
        for i in 0..n {
            let c = assignments[i];
            counts[c] += 1;
            let p = point(i);
            let acc = &mut sums[c * sub_dim..(c + 1) * sub_dim];
            for d in 0..sub_dim {
                acc[d] += p[d];
            }
        }

        let mut max_movement = 0.0f32;
        for c in 0..k {
            // Empty clusters keep their previous centroid.
            if counts[c] == 0 {
                continue;
            }
            let inv = 1.0 / counts[c] as f32;
            let old = &mut centroids[c * sub_dim..(c + 1) * sub_dim];
            let new = &sums[c * sub_dim..(c + 1) * sub_dim];
            let mut movement_sq = 0.0f32;
            for d in 0..sub_dim {
                let updated = new[d] * inv;
                let diff = updated - old[d];
                movement_sq += diff * diff;
                old[d] = updated;
            }
            let movement = movement_sq.sqrt();
            if movement > max_movement {
                max_movement = movement;
            }
        }

        if max_movement < convergence_threshold {
            tracing::debug!(iteration, max_movement, "k-means converged early");
            break;
        }
    }

    centroids
}
