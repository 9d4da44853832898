//! Corpus ingestion: newline-delimited text in, embedded chunks out.
//!
//! Ingestion is idempotent: each chunk carries a SHA-256 content hash and
//! the store ignores rows whose hash already exists, so re-running over
//! the same corpus adds nothing.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use manualbot_types::NewChunk;

use crate::embeddings::EmbeddingClient;
use crate::store::ChunkStore;

/// Embedding calls are batched to keep request sizes bounded.
const EMBED_BATCH_SIZE: usize = 64;

/// Counters from one ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Non-blank lines found in the input.
    pub lines_read: usize,
    /// Rows actually inserted into the store.
    pub chunks_ingested: usize,
    /// Lines skipped because their content hash was already present,
    /// either earlier in the input or in the store.
    pub duplicates_skipped: usize,
}

/// Ingest a newline-delimited corpus file. Blank lines are skipped.
pub async fn ingest_corpus(
    store: &dyn ChunkStore,
    embedder: &dyn EmbeddingClient,
    path: &Path,
) -> Result<IngestReport> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read corpus file {}", path.display()))?;
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    ingest_lines(store, embedder, lines).await
}

/// Ingest pre-split corpus lines.
pub async fn ingest_lines(
    store: &dyn ChunkStore,
    embedder: &dyn EmbeddingClient,
    lines: Vec<String>,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        lines_read: lines.len(),
        ..Default::default()
    };

    // Dedup within the input before spending embedding calls.
    let mut seen = HashSet::new();
    let mut pending: Vec<(String, String)> = Vec::new();
    for line in lines {
        let hash = hash_content(&line);
        if seen.insert(hash.clone()) {
            pending.push((line, hash));
        } else {
            report.duplicates_skipped += 1;
        }
    }

    for batch in pending.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|(content, _)| content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        let chunks: Vec<NewChunk> = batch
            .iter()
            .zip(embeddings)
            .map(|((content, hash), embedding)| NewChunk {
                content: content.clone(),
                content_hash: hash.clone(),
                embedding,
            })
            .collect();

        let inserted = store.insert_chunks(&chunks).await?;
        report.chunks_ingested += inserted;
        report.duplicates_skipped += chunks.len() - inserted;
        debug!(batch = chunks.len(), inserted, "ingested batch");
    }

    info!(
        lines = report.lines_read,
        ingested = report.chunks_ingested,
        skipped = report.duplicates_skipped,
        "corpus ingestion complete"
    );
    Ok(report)
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
