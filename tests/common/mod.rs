//! Fake backends and server helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use policy_rag::config::Config;
use policy_rag::{ChatModel, ChatOutput, Embedder, RagService};

const VOCABULARY: &[&str] = &[
    "speed", "limit", "truck", "bus", "bike", "rail", "parking", "fine", "school", "night",
];

/// Keyword-count embedder: one dimension per vocabulary word plus a small
/// bias so no vector is all zeros.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = VOCABULARY
        .iter()
        .map(|w| lower.matches(w).count() as f32)
        .collect();
    v.push(0.1);
    v
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

/// Embeds documents like [`KeywordEmbedder`] but answers queries with a
/// vector of a different model's width.
pub struct MismatchedQueryEmbedder;

#[async_trait]
impl Embedder for MismatchedQueryEmbedder {
    fn model_name(&self) -> &str {
        "mismatched-test"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Ollama connection error (is it reachable at http://127.0.0.1:9?)")
    }
}

/// Chat stub that echoes the prompt's `QUERY:` line and the context it saw.
#[derive(Default)]
pub struct EchoChat {
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl EchoChat {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for EchoChat {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<ChatOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        let query_line = prompt
            .lines()
            .find(|l| l.starts_with("QUERY: "))
            .unwrap_or_default();
        let context = prompt
            .split_once("CONTEXT:\n")
            .and_then(|(_, rest)| rest.split_once("\n\nQUERY: "))
            .map(|(ctx, _)| ctx.trim())
            .unwrap_or_default();

        Ok(ChatOutput::Text(format!(
            "{} | context: {}",
            query_line, context
        )))
    }
}

/// Chat stub answering with heterogeneous content parts.
pub struct PartsChat;

#[async_trait]
impl ChatModel for PartsChat {
    fn model_name(&self) -> &str {
        "parts"
    }

    async fn generate(&self, _prompt: &str) -> Result<ChatOutput> {
        Ok(ChatOutput::from_value(serde_json::json!([
            { "type": "text", "text": "Buses have priority." },
            { "type": "citation", "source": "page 3" },
            "Cars must yield."
        ])))
    }
}

#[derive(Default)]
pub struct FailingChat {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for FailingChat {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<ChatOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        bail!("generation backend down")
    }
}

/// Config pointing at `document` with the given chunking.
pub fn test_config(document: &Path, chunk_size: usize, chunk_overlap: usize) -> Config {
    let mut cfg = Config::default();
    cfg.document.path = document.to_path_buf();
    cfg.chunking.chunk_size = chunk_size;
    cfg.chunking.chunk_overlap = chunk_overlap;
    cfg
}

/// Build a service over `text` written to a temp file.
pub async fn build_service(
    dir: &Path,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
) -> Result<RagService> {
    let path = dir.join("policy.txt");
    std::fs::write(&path, text)?;
    let cfg = test_config(&path, chunk_size, chunk_overlap);
    RagService::build(&cfg, embedder, chat).await
}

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn_router(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A policy text with several distinct topics, one per paragraph.
pub fn multi_topic_policy() -> String {
    [
        "Section 1. The speed limit in residential streets is 30 km/h. Speed cameras enforce the limit.",
        "Section 2. Trucks above 7.5 t may not enter the city centre; each truck needs a permit.",
        "Section 3. Bus lanes are reserved for buses and taxis. A bus has priority at junctions.",
        "Section 4. Bike parking is free at every rail station. Bike lanes are separated from traffic.",
        "Section 5. Parking without a ticket results in a fine of 40 EUR. Night parking is free.",
        "Section 6. Near a school the speed limit drops to 20 km/h during school hours.",
    ]
    .join("\n\n")
}
