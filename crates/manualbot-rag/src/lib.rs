//! manualbot-rag: the retrieval-augmented query pipeline.
//!
//! Provides:
//! - OpenAI embedding and chat-completion clients
//! - Supabase-backed similarity retrieval and chunk storage
//! - Pure prompt assembly with a grounding policy
//! - The sequential pipeline orchestrator
//! - Idempotent corpus ingestion and text chunking

pub mod chunking;
pub mod completion;
pub mod embeddings;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

use std::time::Duration;

use manualbot_types::PipelineError;

/// Build the shared HTTP client with the configured per-request deadline.
///
/// Every upstream call in the pipeline goes through one of these clients,
/// so the deadline bounds each stage individually.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Map a network-level reqwest failure onto the error taxonomy.
pub(crate) fn classify_transport(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() {
        PipelineError::Timeout
    } else {
        PipelineError::Transport(err.to_string())
    }
}
