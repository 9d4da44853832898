//! Embedding client: maps free text to fixed-length vectors.

use async_trait::async_trait;

use manualbot_config::OpenAiConfig;
use manualbot_types::{PipelineError, Result};

use crate::classify_transport;

/// Trait for embedding text into vectors.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Model name. Must match the model used at ingestion time.
    fn model(&self) -> &str;
    /// Vector dimensionality produced by this model.
    fn dimensions(&self) -> usize;
    /// Embed a single query.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// OpenAI embeddings API client.
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddings {
    pub fn new(client: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "cannot embed empty text".into(),
            ));
        }
        let batch = self.embed_batch(&[text.to_string()]).await?;
        batch.into_iter().next().ok_or_else(|| {
            PipelineError::MalformedResponse("empty embedding data array".into())
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let resp = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        let payload = resp.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            return Err(PipelineError::Upstream {
                status: status.as_u16(),
                body: payload,
            });
        }

        parse_embeddings(&payload, texts.len(), self.dimensions)
    }
}

/// Walk an embeddings API payload, enforcing one vector per input at the
/// configured dimensionality.
fn parse_embeddings(payload: &str, expected: usize, dimensions: usize) -> Result<Vec<Vec<f32>>> {
    let json: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| PipelineError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| PipelineError::MalformedResponse("missing data array".into()))?;

    if data.len() != expected {
        return Err(PipelineError::MalformedResponse(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }

    let mut embeddings = Vec::with_capacity(expected);
    for item in data {
        let embedding: Vec<f32> = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| PipelineError::MalformedResponse("missing embedding array".into()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        // Never hand a truncated vector to similarity search.
        if embedding.len() != dimensions {
            return Err(PipelineError::MalformedResponse(format!(
                "embedding has {} dimensions, expected {dimensions}",
                embedding.len()
            )));
        }
        embeddings.push(embedding);
    }

    Ok(embeddings)
}
