//! Chat-completion client.

use async_trait::async_trait;

use manualbot_config::OpenAiConfig;
use manualbot_types::{Completion, Message, PipelineError, Result, Role};

use crate::classify_transport;

/// Trait for generating a reply from an assembled message list.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Model name.
    fn model(&self) -> &str;
    /// Send the ordered message list and return the assistant reply.
    ///
    /// The list must be non-empty and start with exactly one system
    /// message; violations are rejected before any network call.
    async fn complete(&self, messages: &[Message]) -> Result<Completion>;
}

/// OpenAI chat-completions API client.
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(client: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.chat_model.clone(),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion> {
        validate_prompt(messages)?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
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

        let raw: serde_json::Value = serde_json::from_str(&payload)
            .map_err(|e| PipelineError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let reply = raw
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                PipelineError::MalformedResponse("missing choices[0].message.content".into())
            })?
            .to_string();

        Ok(Completion { reply, raw })
    }
}

/// Check the prompt contract shared by every completion backend.
pub(crate) fn validate_prompt(messages: &[Message]) -> Result<()> {
    match messages.first() {
        None => Err(PipelineError::InvalidRequest(
            "prompt must not be empty".into(),
        )),
        Some(first) if first.role != Role::System => Err(PipelineError::InvalidRequest(
            "prompt must start with a system message".into(),
        )),
        Some(_) => Ok(()),
    }
}
