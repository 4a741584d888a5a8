//! Cosine-similarity ranking over stored chunk embeddings.
//!
//! # Ranking Algorithm
//!
//! 1. Reject a query vector whose length differs from the configured
//!    dimensionality (fatal to the request).
//! 2. Score every candidate with [`cosine_similarity`] (full scan, no index).
//!    A candidate with a mismatched or non-finite vector is logged and
//!    skipped.
//! 3. Stable-sort by score, descending. Ties keep input order.
//! 4. Optionally keep only the best chunk per document.
//! 5. Truncate to `top_k`.

use serde::{Deserialize, Serialize};

use crate::embedding::cosine_similarity;
use crate::error::RagError;
use crate::models::{Embedding, EMBEDDING_DIMS};

/// Ranking parameters, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RankOptions {
    /// Maximum results to return.
    pub top_k: usize,
    /// Keep at most one chunk per document. Off by default: several chunks
    /// of the same document may all make the top-k.
    pub dedup_by_document: bool,
    /// Expected vector dimensionality.
    pub dims: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            dedup_by_document: false,
            dims: EMBEDDING_DIMS,
        }
    }
}

impl RankOptions {
    pub fn validate(&self) -> Result<(), RagError> {
        if self.top_k == 0 {
            return Err(RagError::InvalidInput("retrieval.top_k must be >= 1".into()));
        }
        if self.dims == 0 {
            return Err(RagError::InvalidInput("retrieval.dims must be > 0".into()));
        }
        Ok(())
    }
}

/// A stored chunk eligible for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub vector: Vec<f32>,
}

impl From<Embedding> for Candidate {
    fn from(e: Embedding) -> Self {
        Self {
            id: e.id,
            document_id: e.document_id,
            chunk_index: e.chunk_index,
            text: e.content,
            vector: e.vector,
        }
    }
}

/// A ranked chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub score: f32,
}

/// Rank `candidates` against `query_vec` and return the top-k, best first.
pub fn rank(
    query_vec: &[f32],
    candidates: &[Candidate],
    opts: &RankOptions,
) -> Result<Vec<RankedChunk>, RagError> {
    if query_vec.len() != opts.dims {
        return Err(RagError::DimensionMismatch {
            expected: opts.dims,
            actual: query_vec.len(),
        });
    }

    let mut scored: Vec<(&Candidate, f32)> = Vec::with_capacity(candidates.len());
    for cand in candidates {
        match cosine_similarity(query_vec, &cand.vector) {
            Ok(score) if score.is_finite() => scored.push((cand, score)),
            Ok(score) => {
                tracing::warn!(
                    document_id = %cand.document_id,
                    chunk_index = cand.chunk_index,
                    score,
                    "skipping candidate with malformed vector"
                );
            }
            Err(e) => {
                tracing::warn!(
                    document_id = %cand.document_id,
                    chunk_index = cand.chunk_index,
                    error = %e,
                    "skipping candidate"
                );
            }
        }
    }

    // sort_by is stable: equal scores keep input order
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut seen_docs: Vec<&str> = Vec::new();
    let mut results = Vec::with_capacity(opts.top_k.min(scored.len()));
    for (cand, score) in scored {
        if results.len() >= opts.top_k {
            break;
        }
        if opts.dedup_by_document {
            if seen_docs.contains(&cand.document_id.as_str()) {
                continue;
            }
            seen_docs.push(&cand.document_id);
        }
        results.push(RankedChunk {
            id: cand.id.clone(),
            document_id: cand.document_id.clone(),
            chunk_index: cand.chunk_index,
            text: cand.text.clone(),
            score,
        });
    }

    Ok(results)
}
