//! Embedding provider trait, the hashing embedder, and vector utilities.
//!
//! [`HashingEmbedder`] maps text to a fixed-length unit vector without any
//! model: each whitespace-separated word is hashed, and every dimension `d`
//! receives `sin((hash * (d + 1)) mod 100) / (2 * word_count)` from each
//! word. The result is L2-normalised.
//!
//! The scheme is a pure bag of words: reordering the words of a text
//! yields exactly the same vector. Word hashes are sorted before
//! accumulation so floating-point summation order cannot break that.

use crate::error::RagError;
use crate::models::EMBEDDING_DIMS;

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier.
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a single text. Fails on empty input.
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// Deterministic word-hash embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIMS)
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing-bow"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(RagError::InvalidInput(
                "text to embed must be a non-empty string".into(),
            ));
        }

        let mut hashes: Vec<u32> = normalized.split_whitespace().map(word_hash).collect();
        hashes.sort_unstable();

        let scale = 2.0 * hashes.len() as f64;
        let mut vector = vec![0.0f64; self.dims];
        for &hash in &hashes {
            for (d, slot) in vector.iter_mut().enumerate() {
                let phase = (u64::from(hash) * (d as u64 + 1)) % 100;
                *slot += (phase as f64).sin() / scale;
            }
        }

        Ok(normalize_or_unit(&vector))
    }
}

/// 32-bit polynomial rolling hash (`h = h * 31 + unit`) over UTF-16 code
/// units, wrapping on overflow; the absolute value is returned.
pub fn word_hash(word: &str) -> u32 {
    let hash = word
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit)));
    hash.unsigned_abs()
}

/// Scale to unit length, or return `[1, 0, 0, ...]` for a zero vector.
fn normalize_or_unit(vector: &[f64]) -> Vec<f32> {
    let magnitude = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        let mut unit = vec![0.0f32; vector.len()];
        if let Some(first) = unit.first_mut() {
            *first = 1.0;
        }
        return unit;
    }
    vector.iter().map(|v| (v / magnitude) as f32).collect()
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use support_rag_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Trailing bytes that do not form
/// a whole `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` when either vector has zero
/// magnitude. Vectors of different lengths are a
/// [`RagError::DimensionMismatch`], never a silent zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, RagError> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}
