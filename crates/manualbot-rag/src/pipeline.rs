//! The retrieval-augmented query pipeline.
//!
//! One request walks strictly sequential stages:
//! embed the question, fetch similar chunks, assemble the prompt, ask the
//! completion model. Any stage failure aborts the remaining stages; there
//! is no partial-context fallback (a retrieval fault fails the request
//! rather than risking an ungrounded answer).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use manualbot_config::RetrievalConfig;
use manualbot_types::{
    Completion, Conversation, Message, PipelineError, Result, RetrievedChunk,
};

use crate::completion::CompletionClient;
use crate::embeddings::EmbeddingClient;
use crate::prompt::{DEFAULT_SYSTEM_INSTRUCTIONS, assemble};
use crate::retrieval::Retriever;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Retrieving,
    Assembling,
    Completing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Retrieving => "retrieving",
            Stage::Assembling => "assembling",
            Stage::Completing => "completing",
        };
        f.write_str(name)
    }
}

/// Everything produced by one successful pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Chunks backing the answer, ranked descending by similarity.
    pub retrieved: Vec<RetrievedChunk>,
    /// The exact message list sent upstream.
    pub prompt: Vec<Message>,
    /// The completion, with the verbatim upstream JSON.
    pub completion: Completion,
}

/// Sequences the pipeline over injected clients.
pub struct Pipeline {
    embedder: Arc<dyn EmbeddingClient>,
    retriever: Arc<dyn Retriever>,
    completer: Arc<dyn CompletionClient>,
    retrieval: RetrievalConfig,
    system_instructions: String,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        retriever: Arc<dyn Retriever>,
        completer: Arc<dyn CompletionClient>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            retriever,
            completer,
            retrieval,
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
        }
    }

    /// Replace the default persona/grounding instructions.
    pub fn with_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = instructions.into();
        self
    }

    /// Run the full pipeline for one question without touching any
    /// conversation state. `history` holds the prior turns to forward.
    pub async fn run(&self, history: &Conversation, question: &str) -> Result<PipelineRun> {
        if question.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "question must not be empty".into(),
            ));
        }

        let embedding = self
            .stage(Stage::Embedding, self.embedder.embed(question))
            .await?;

        let retrieved = self
            .stage(
                Stage::Retrieving,
                self.retriever.retrieve(
                    &embedding,
                    self.retrieval.match_count,
                    self.retrieval.match_threshold,
                ),
            )
            .await?;
        if retrieved.is_empty() {
            debug!("no chunks cleared the similarity threshold");
        }

        // Assembly is pure and infallible; it still goes through the
        // stage wrapper so every transition is tagged in the logs.
        let prompt = self
            .stage(
                Stage::Assembling,
                std::future::ready(Ok(assemble(
                    &self.system_instructions,
                    &retrieved,
                    history,
                    question,
                ))),
            )
            .await?;

        let completion = self
            .stage(Stage::Completing, self.completer.complete(&prompt))
            .await?;

        Ok(PipelineRun {
            retrieved,
            prompt,
            completion,
        })
    }

    /// Run the pipeline for one session turn.
    ///
    /// On success the question and reply are appended to `conversation`
    /// exactly once, in that order. On failure the conversation is left
    /// untouched.
    pub async fn answer(
        &self,
        conversation: &mut Conversation,
        question: &str,
    ) -> Result<String> {
        let run = self.run(conversation, question).await?;
        conversation.push_user(question);
        conversation.push_assistant(run.completion.reply.clone());
        Ok(run.completion.reply)
    }

    async fn stage<T>(&self, stage: Stage, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match fut.await {
            Ok(value) => {
                debug!(%stage, "stage complete");
                Ok(value)
            }
            Err(err) => {
                warn!(%stage, error = %err, "pipeline stage failed");
                Err(err)
            }
        }
    }
}
