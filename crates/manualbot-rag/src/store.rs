//! Supabase-backed chunk storage and similarity search.
//!
//! Retrieval goes through the `match_documents` PostgREST RPC; ingestion
//! inserts rows into the `documents` table keyed on a content hash so
//! re-runs are idempotent.

use async_trait::async_trait;

use manualbot_config::SupabaseConfig;
use manualbot_types::{NewChunk, PipelineError, Result, RetrievedChunk};

use crate::classify_transport;
use crate::retrieval::{Retriever, rank_chunks};

/// Trait for persisting ingested chunks.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert chunks, ignoring rows whose `content_hash` already exists.
    /// Returns the number of rows actually inserted.
    async fn insert_chunks(&self, chunks: &[NewChunk]) -> Result<usize>;
}

/// Supabase PostgREST client implementing both retrieval and storage.
pub struct SupabaseStore {
    client: reqwest::Client,
    url: String,
    key: String,
}

impl SupabaseStore {
    pub fn new(client: reqwest::Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            key: config.key.clone(),
        }
    }

    async fn read_body(resp: reqwest::Response) -> Result<(reqwest::StatusCode, String)> {
        let status = resp.status();
        let body = resp.text().await.map_err(classify_transport)?;
        Ok((status, body))
    }
}

#[async_trait]
impl Retriever for SupabaseStore {
    async fn retrieve(
        &self,
        query_embedding: &[f32],
        count: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievedChunk>> {
        let body = serde_json::json!({
            "query_embedding": query_embedding,
            "match_threshold": threshold,
            "match_count": count,
        });

        let resp = self
            .client
            .post(format!("{}/rest/v1/rpc/match_documents", self.url))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let (status, payload) = Self::read_body(resp).await?;
        if !status.is_success() {
            return Err(PipelineError::Upstream {
                status: status.as_u16(),
                body: payload,
            });
        }

        let rows: Vec<RetrievedChunk> = serde_json::from_str(&payload).map_err(|e| {
            PipelineError::MalformedResponse(format!("invalid match_documents response: {e}"))
        })?;

        Ok(rank_chunks(rows, count, threshold))
    }
}

#[async_trait]
impl ChunkStore for SupabaseStore {
    async fn insert_chunks(&self, chunks: &[NewChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let resp = self
            .client
            .post(format!(
                "{}/rest/v1/documents?on_conflict=content_hash",
                self.url
            ))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&chunks)
            .send()
            .await
            .map_err(classify_transport)?;

        let (status, payload) = Self::read_body(resp).await?;
        if !status.is_success() {
            return Err(PipelineError::Upstream {
                status: status.as_u16(),
                body: payload,
            });
        }

        // With return=representation the body is the array of inserted rows.
        let inserted: Vec<serde_json::Value> = serde_json::from_str(&payload).map_err(|e| {
            PipelineError::MalformedResponse(format!("invalid insert response: {e}"))
        })?;
        Ok(inserted.len())
    }
}
