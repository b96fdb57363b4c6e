//! The query pipeline.
//!
//! [`RagService`] owns the built index and the two backends. It is
//! constructed once by [`RagService::build`] (load → split → embed →
//! index) and then shared read-only with the HTTP handlers.
//!
//! # Query flow
//!
//! ```text
//! query ─▶ embed_query ─▶ index.search(top_k) ─▶ build_context
//!                                                    │
//!        answer ◀─ into_text ◀─ generate ◀─ build_prompt
//! ```

use anyhow::{bail, Context, Result};
use std::sync::Arc;

use crate::chunk::split_text;
use crate::config::{Config, RetrievalConfig};
use crate::embedding::Embedder;
use crate::generation::ChatModel;
use crate::index::VectorIndex;
use crate::loader::load_document;
use crate::models::ScoredChunk;

/// Reply the model is told to give when the context lacks the answer.
pub const UNKNOWN_ANSWER: &str = "I don't know based on the provided policy document.";

/// Failure of a single query.
#[derive(Debug)]
pub enum RagError {
    /// The query was empty or whitespace. No backend was called.
    EmptyQuery,
    /// Embedding, search or generation failed.
    Backend(anyhow::Error),
}

impl std::fmt::Display for RagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RagError::EmptyQuery => write!(f, "Missing query"),
            RagError::Backend(e) => write!(f, "{:#}", e),
        }
    }
}

impl std::error::Error for RagError {}

impl From<anyhow::Error> for RagError {
    fn from(e: anyhow::Error) -> Self {
        RagError::Backend(e)
    }
}

pub struct RagService {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    retrieval: RetrievalConfig,
}

impl RagService {
    pub fn new(
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            chat,
            retrieval,
        }
    }

    /// Run the startup pipeline and return a ready service.
    ///
    /// Any error here is fatal: the caller must not start serving.
    pub async fn build(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        let doc = load_document(&config.document.path)?;
        let text = doc.full_text();

        let chunks = split_text(
            &text,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        )?;
        tracing::info!(
            path = %doc.path.display(),
            loaded_at = %doc.loaded_at.to_rfc3339(),
            pages = doc.pages.len(),
            chars = text.chars().count(),
            chunks = chunks.len(),
            "document split"
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder
            .embed_documents(&texts)
            .await
            .with_context(|| format!("Failed to embed chunks with {}", embedder.model_name()))?;

        let index = VectorIndex::from_parts(chunks, embeddings)?;
        tracing::info!(
            chunks = index.len(),
            dims = index.dims(),
            model = embedder.model_name(),
            "index built"
        );

        Ok(Self::new(index, embedder, chat, config.retrieval.clone()))
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Embed `query` and return the `top_k` most similar chunks.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let vector = self
            .embedder
            .embed_query(query)
            .await
            .context("Failed to embed query")?;
        if vector.len() != self.index.dims() {
            bail!(
                "query embedding has {} dimensions, index has {} ({})",
                vector.len(),
                self.index.dims(),
                self.embedder.model_name()
            );
        }
        Ok(self.index.search(&vector, self.retrieval.top_k))
    }

    /// Join chunk texts in relevance order with the configured delimiter.
    pub fn build_context(&self, hits: &[ScoredChunk]) -> String {
        hits.iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(&self.retrieval.context_delimiter)
    }

    /// Answer `query` from the indexed document.
    pub async fn answer(&self, query: &str) -> Result<String, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let hits = self.retrieve(query).await?;
        tracing::debug!(
            hits = hits.len(),
            chunks = ?hits.iter().map(|h| h.chunk.index).collect::<Vec<_>>(),
            "retrieved context"
        );

        let context = self.build_context(&hits);
        let prompt = build_prompt(&context, query);

        let output = self
            .chat
            .generate(&prompt)
            .await
            .with_context(|| format!("Generation failed with {}", self.chat.model_name()))?;

        Ok(output.into_text())
    }
}

/// Build the grounded-answer prompt.
///
/// The query is embedded verbatim on a single `QUERY:` line.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You answer questions about a transport policy document.\n\
         Use ONLY the information in the context below. Do not use prior knowledge.\n\
         If the context does not contain the answer, reply exactly: \"{unknown}\"\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUERY: {query}\n\
         \n\
         ANSWER:",
        unknown = UNKNOWN_ANSWER,
        context = context,
        query = query,
    )
}
