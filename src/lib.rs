//! # policy-rag
//!
//! **Retrieval-augmented answers over a transport policy document.**
//!
//! Two processes share this crate:
//!
//! - the **query service** (`policy-rag serve`) loads one document, splits
//!   it into overlapping chunks, embeds them into an in-memory index and
//!   answers `POST /query` with a grounded answer from a chat model;
//! - the **tool adapter** (`policy-rag mcp`) exposes the
//!   `getTransportPolicy` MCP tool on stdio and forwards each call to the
//!   query service over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  stdio  ┌─────────────┐  HTTP  ┌──────────────────────┐
//! │ MCP client │───────▶│ mcp adapter │──────▶│ query service        │
//! └────────────┘         └─────────────┘        │ index ─ embed ─ chat │
//!                                               └──────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types: `SourceDocument`, `Chunk`, `ScoredChunk` |
//! | [`loader`] | Document loading (PDF via pdf-extract, plain text) |
//! | [`chunk`] | Fixed-size overlapping text chunker |
//! | [`backend`] | Shared HTTP plumbing for model backends |
//! | [`embedding`] | `Embedder` trait: Ollama, OpenAI, local fastembed |
//! | [`generation`] | `ChatModel` trait and answer normalization |
//! | [`index`] | In-memory cosine-similarity index |
//! | [`rag`] | `RagService`: startup pipeline and query flow |
//! | [`server`] | HTTP query service (Axum) |
//! | [`mcp`] | MCP tool adapter (rmcp, stdio) |
//! | [`logging`] | `tracing` subscriber on stderr |

pub mod backend;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod generation;
pub mod index;
pub mod loader;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod rag;
pub mod server;

pub use embedding::Embedder;
pub use generation::{ChatModel, ChatOutput};
pub use rag::{RagError, RagService};
