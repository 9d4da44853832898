//! Environment-based configuration, validated once at startup.
//!
//! No component reads the process environment on its own: everything is
//! collected here into a [`Config`] that is passed into constructors.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Connection settings for the OpenAI-style API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Bearer credential. Required.
    pub api_key: String,
    /// Base URL, overridable for tests and proxies.
    pub base_url: String,
    /// Chat-completion model name.
    pub chat_model: String,
    /// Embedding model name. Must match the model used at ingestion time;
    /// vectors from different models are not comparable.
    pub embedding_model: String,
    /// Expected embedding dimensionality for the configured model.
    pub embedding_dimensions: usize,
    /// Sampling temperature for completions.
    pub temperature: f32,
}

/// Connection settings for the Supabase vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Service or anon key, sent as both `apikey` and bearer token.
    pub key: String,
}

/// Retrieval tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum similarity score a chunk must meet (T).
    pub match_threshold: f32,
    /// Maximum number of chunks returned per retrieval (K).
    pub match_count: usize,
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Top-level manualbot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub supabase: SupabaseConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
    /// Per-request deadline applied to every upstream HTTP call.
    pub request_timeout: Duration,
}

impl Config {
    /// Load and validate configuration from the process environment.
    ///
    /// Reads `.env` first if present. Fails fast on missing credentials
    /// or unparseable numeric values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let api_key = require_var("OPENAI_API_KEY")?;
        let supabase_url = require_var("SUPABASE_URL")?;
        let supabase_key = require_var("SUPABASE_KEY")?;

        Ok(Self {
            openai: OpenAiConfig {
                api_key,
                base_url: var_or("OPENAI_BASE_URL", "https://api.openai.com"),
                chat_model: var_or("MANUALBOT_CHAT_MODEL", "gpt-4"),
                embedding_model: var_or("MANUALBOT_EMBEDDING_MODEL", "text-embedding-3-small"),
                embedding_dimensions: parse_var("MANUALBOT_EMBEDDING_DIMENSIONS", 1536)?,
                temperature: parse_var("MANUALBOT_TEMPERATURE", 0.2)?,
            },
            supabase: SupabaseConfig {
                url: supabase_url.trim_end_matches('/').to_string(),
                key: supabase_key,
            },
            retrieval: RetrievalConfig {
                match_threshold: parse_var("MANUALBOT_MATCH_THRESHOLD", 0.75)?,
                match_count: parse_var("MANUALBOT_MATCH_COUNT", 10)?,
            },
            server: ServerConfig {
                host: var_or("MANUALBOT_HOST", "0.0.0.0"),
                port: parse_var("MANUALBOT_PORT", 5000)?,
            },
            request_timeout: Duration::from_secs(parse_var(
                "MANUALBOT_REQUEST_TIMEOUT_SECS",
                30,
            )?),
        })
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.75,
            match_count: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
            var: name,
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_defaults() {
        let r = RetrievalConfig::default();
        assert!((r.match_threshold - 0.75).abs() < f32::EPSILON);
        assert_eq!(r.match_count, 10);
    }

    #[test]
    fn test_server_defaults() {
        let s = ServerConfig::default();
        assert_eq!(s.port, 5000);
        assert_eq!(s.host, "0.0.0.0");
    }

    #[test]
    fn test_parse_var_uses_default_when_unset() {
        let value: usize = parse_var("MANUALBOT_TEST_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        // SAFETY: test-only env mutation, variable name is unique to this test.
        unsafe { std::env::set_var("MANUALBOT_TEST_GARBAGE_VAR", "not-a-number") };
        let result: Result<usize, _> = parse_var("MANUALBOT_TEST_GARBAGE_VAR", 7);
        assert!(matches!(result, Err(ConfigError::InvalidVar { .. })));
        unsafe { std::env::remove_var("MANUALBOT_TEST_GARBAGE_VAR") };
    }

    #[test]
    fn test_require_var_rejects_blank() {
        unsafe { std::env::set_var("MANUALBOT_TEST_BLANK_VAR", "  ") };
        let result = require_var("MANUALBOT_TEST_BLANK_VAR");
        assert!(matches!(result, Err(ConfigError::MissingVar(_))));
        unsafe { std::env::remove_var("MANUALBOT_TEST_BLANK_VAR") };
    }
}
