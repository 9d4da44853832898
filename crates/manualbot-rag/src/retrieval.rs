//! Similarity retrieval over the vector store.

use async_trait::async_trait;

use manualbot_types::{Result, RetrievedChunk};

/// Trait for top-K similarity search.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `count` chunks with similarity >= `threshold`, ranked
    /// descending by similarity.
    ///
    /// An empty result is a normal outcome (the corpus simply has nothing
    /// relevant), never an error. Errors mean the store itself failed.
    async fn retrieve(
        &self,
        query_embedding: &[f32],
        count: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievedChunk>>;
}

/// Enforce the retrieval-result invariants on rows coming back from a
/// store: drop below-threshold entries, order descending, truncate to
/// `count`. The store is expected to do this already; this keeps the
/// guarantee local.
pub fn rank_chunks(
    mut chunks: Vec<RetrievedChunk>,
    count: usize,
    threshold: f32,
) -> Vec<RetrievedChunk> {
    chunks.retain(|c| c.similarity >= threshold);
    chunks.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    chunks.truncate(count);
    chunks
}

/// Cosine similarity between two vectors.
///
/// Mismatched or empty inputs score 0.0 rather than panicking; the
/// embedding client guarantees dimensionality on the production path.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
