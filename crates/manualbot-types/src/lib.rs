use serde::{Deserialize, Serialize};
use thiserror::Error;

// ──────────────────── Chat Types ────────────────────

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
///
/// Ordering is significant: an assembled prompt starts with exactly one
/// system message, followed by user/assistant turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An append-only sequence of user/assistant turns for one session.
///
/// The system message is not stored here; it is prepended at prompt
/// assembly time. Turns are never reordered or removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conversation from caller-supplied history.
    ///
    /// System messages are dropped: history holds turns only.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .filter(|m| m.role != Role::System)
                .collect(),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ──────────────────── Retrieval Types ────────────────────

/// A corpus chunk returned from similarity search.
///
/// Chunks are immutable once ingested; `similarity` is the match score
/// assigned by the store for the current query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub similarity: f32,
}

/// A corpus chunk prepared for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChunk {
    pub content: String,
    /// SHA-256 hex of `content`; idempotence key for inserts.
    pub content_hash: String,
    pub embedding: Vec<f32>,
}

/// A chat-completion result.
///
/// `raw` is the verbatim upstream JSON, kept so the HTTP gateway can pass
/// it through unmodified; `reply` is the extracted assistant text.
#[derive(Debug, Clone)]
pub struct Completion {
    pub reply: String,
    pub raw: serde_json::Value,
}

// ──────────────────── Errors ────────────────────

/// Failures the query pipeline can surface.
///
/// "Zero retrieval matches" is not represented here: an empty retrieval
/// result is a legitimate outcome, not an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream API or datastore replied with a non-success status.
    /// Status and body are preserved for diagnosis.
    #[error("upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },
    /// Upstream replied 2xx but the payload did not match the documented
    /// shape (including a vector of the wrong dimensionality).
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    /// Network-level failure reaching an upstream.
    #[error("transport error: {0}")]
    Transport(String),
    /// The configured per-request deadline expired.
    #[error("upstream request timed out")]
    Timeout,
    /// Caller-side contract violation, detected before any network call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
