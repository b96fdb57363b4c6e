//! Chat/generation backend abstraction.
//!
//! A [`ChatModel`] takes one prompt and returns a [`ChatOutput`]. Backends
//! may answer with a plain string or with a list of content parts (some
//! text, some structured), so the raw content is kept as-is until
//! [`ChatOutput::into_text`] normalizes it into the answer string.
//!
//! Implementations:
//! - **[`OllamaChat`]**: `POST /api/chat` with `stream: false`.
//! - **[`OpenAIChat`]**: `POST /v1/chat/completions`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::{build_client, endpoint, post_json};
use crate::config::GenerationConfig;

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";
const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";

/// Raw content returned by a generation backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutput {
    Text(String),
    /// Heterogeneous content parts, in the order the backend returned them.
    Parts(Vec<serde_json::Value>),
    Other(serde_json::Value),
}

impl ChatOutput {
    /// Classify a raw JSON `content` value.
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => ChatOutput::Text(s),
            serde_json::Value::Array(parts) => ChatOutput::Parts(parts),
            other => ChatOutput::Other(other),
        }
    }

    /// Normalize into a single answer string.
    ///
    /// Parts contribute their textual content joined by `\n`: a string part
    /// is its own text, an object part contributes its `text` field, and
    /// parts with no text are skipped. Anything else is rendered as JSON,
    /// except `null` which becomes the empty string.
    pub fn into_text(self) -> String {
        match self {
            ChatOutput::Text(s) => s,
            ChatOutput::Parts(parts) => parts
                .iter()
                .filter_map(part_text)
                .collect::<Vec<_>>()
                .join("\n"),
            ChatOutput::Other(serde_json::Value::Null) => String::new(),
            ChatOutput::Other(v) => v.to_string(),
        }
    }
}

fn part_text(part: &serde_json::Value) -> Option<&str> {
    match part {
        serde_json::Value::String(s) => Some(s.as_str()),
        serde_json::Value::Object(map) => map.get("text").and_then(|t| t.as_str()),
        _ => None,
    }
}

/// Prompt → response backend. Called once per query; no streaming.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<ChatOutput>;
}

/// Create the [`ChatModel`] named by `config.provider`.
pub fn create_chat_model(config: &GenerationConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Ollama ============

/// Non-streaming Ollama chat client.
pub struct OllamaChat {
    http: reqwest::Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl OllamaChat {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(config.timeout_secs)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<ChatOutput> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });
        let json = post_json(
            &self.http,
            &endpoint(&self.url, "/api/chat"),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        parse_ollama_chat(json)
    }
}

fn parse_ollama_chat(mut json: serde_json::Value) -> Result<ChatOutput> {
    let content = json
        .get_mut("message")
        .and_then(|m| m.get_mut("content"))
        .map(serde_json::Value::take)
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))?;
    Ok(ChatOutput::from_value(content))
}

// ============ OpenAI ============

/// Chat completions client for the OpenAI API (or any compatible server).
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIChat {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    max_retries: u32,
}

impl OpenAIChat {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;

        Ok(Self {
            http: build_client(config.timeout_secs)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<ChatOutput> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = post_json(
            &self.http,
            &endpoint(&self.url, "/v1/chat/completions"),
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_chat(json)
    }
}

fn parse_openai_chat(mut json: serde_json::Value) -> Result<ChatOutput> {
    let content = json
        .get_mut("choices")
        .and_then(|c| c.get_mut(0))
        .and_then(|c| c.get_mut("message"))
        .and_then(|m| m.get_mut("content"))
        .map(serde_json::Value::take)
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content")
        })?;
    Ok(ChatOutput::from_value(content))
}
