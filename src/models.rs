//! Core data models used throughout policy-rag.
//!
//! These types represent the source document, its chunks, and the
//! retrieval results that flow through the query pipeline.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Text extracted from one page of the source document.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub text: String,
}

/// The single document the index is built from.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub pages: Vec<Page>,
    /// When the file was read; reported in startup logs.
    pub loaded_at: DateTime<Utc>,
}

impl SourceDocument {
    /// Full document text: pages joined by a blank line.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A contiguous span of the document's full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// A chunk returned by similarity search together with its score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity against the query vector.
    pub score: f32,
}
