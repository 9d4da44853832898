//! In-memory test doubles shared across the crate's unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use manualbot_types::{NewChunk, PipelineError, Result, RetrievedChunk};

use crate::embeddings::EmbeddingClient;
use crate::retrieval::{Retriever, cosine_similarity, rank_chunks};
use crate::store::ChunkStore;

/// Embedder backed by a fixed text-to-vector table.
pub struct TableEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl TableEmbedder {
    pub fn new(dimensions: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, vec)| (text.to_string(), vec.clone()))
                .collect(),
            dimensions,
        }
    }

    fn lookup(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| PipelineError::InvalidRequest(format!("no test vector for {text:?}")))
    }
}

#[async_trait]
impl EmbeddingClient for TableEmbedder {
    fn model(&self) -> &str {
        "table-test"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.lookup(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.lookup(t)).collect()
    }
}

/// In-memory chunk store that also answers similarity queries with
/// cosine scores over the stored embeddings.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<NewChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn insert_chunks(&self, chunks: &[NewChunk]) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let mut inserted = 0;
        for chunk in chunks {
            if rows.iter().all(|r| r.content_hash != chunk.content_hash) {
                rows.push(chunk.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl Retriever for InMemoryStore {
    async fn retrieve(
        &self,
        query_embedding: &[f32],
        count: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievedChunk>> {
        let rows = self.rows.lock().unwrap();
        let scored = rows
            .iter()
            .map(|r| RetrievedChunk {
                content: r.content.clone(),
                similarity: cosine_similarity(query_embedding, &r.embedding),
            })
            .collect();
        Ok(rank_chunks(scored, count, threshold))
    }
}
