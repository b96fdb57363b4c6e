//! # policy-rag CLI
//!
//! ## Usage
//!
//! ```bash
//! policy-rag --config ./config/policy-rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `policy-rag serve` | Build the index and start the HTTP query service |
//! | `policy-rag mcp` | Start the MCP tool adapter on stdio |
//! | `policy-rag ask "<query>"` | Ask a running query service one question |
//! | `policy-rag chunks` | Show how the document is split (no embedding) |
//!
//! ## Examples
//!
//! ```bash
//! # Start the query service on a custom port
//! policy-rag serve --bind 127.0.0.1:4000
//!
//! # Start the adapter against it
//! POLICY_RAG_URL=http://127.0.0.1:4000 policy-rag mcp
//!
//! # Quick check from a shell
//! policy-rag ask "What is the speed limit near schools?"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use policy_rag::chunk::split_text;
use policy_rag::config::{self, Config};
use policy_rag::loader::load_document;
use policy_rag::logging;
use policy_rag::mcp::{self, RagClient};
use policy_rag::server;

/// Retrieval-augmented answers over a transport policy
/// document, served over HTTP and MCP.
#[derive(Parser)]
#[command(
    name = "policy-rag",
    about = "Retrieval-augmented answers over a transport policy document",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// `mcp` and `ask` fall back to defaults when the file does not exist;
    /// `serve` and `chunks` require it.
    #[arg(long, global = true, default_value = "./config/policy-rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the in-memory index and start the HTTP query service.
    ///
    /// The listener is opened only after the document has been loaded,
    /// split and embedded. Any failure before that exits non-zero.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Start the MCP tool adapter on stdio.
    ///
    /// Exposes `getTransportPolicy` and forwards calls to the query service.
    Mcp {
        /// Base URL of the query service. Overrides `[adapter].rag_url`.
        #[arg(long, env = "POLICY_RAG_URL")]
        rag_url: Option<String>,
    },

    /// Ask a running query service a single question.
    Ask {
        /// The question.
        query: String,

        /// Base URL of the query service. Overrides `[adapter].rag_url`.
        #[arg(long, env = "POLICY_RAG_URL")]
        rag_url: Option<String>,
    },

    /// Load and split the configured document, then print chunk statistics.
    Chunks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.command {
        Commands::Mcp { .. } | Commands::Ask { .. } => config::load_config_or_default(&cli.config)?,
        _ => config::load_config(&cli.config)?,
    };
    logging::init_with_config(&cfg.logging);

    if let Err(e) = run(cli.command, cfg).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(command: Commands, mut cfg: Config) -> anyhow::Result<()> {
    match command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
        Commands::Mcp { rag_url } => {
            if let Some(url) = rag_url {
                cfg.adapter.rag_url = url;
            }
            mcp::run_adapter(&cfg).await?;
        }
        Commands::Ask { query, rag_url } => {
            let url = rag_url.unwrap_or_else(|| cfg.adapter.rag_url.clone());
            let client = RagClient::new(&url, cfg.adapter.timeout_secs)?;
            let answer = client.ask(&query).await?;
            println!("{}", answer);
        }
        Commands::Chunks => {
            let doc = load_document(&cfg.document.path)?;
            let chunks = split_text(
                &doc.full_text(),
                cfg.chunking.chunk_size,
                cfg.chunking.chunk_overlap,
            )?;
            println!("document: {}", doc.path.display());
            println!("loaded:   {}", doc.loaded_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("pages:    {}", doc.pages.len());
            println!(
                "chunks:   {} (size {}, overlap {})",
                chunks.len(),
                cfg.chunking.chunk_size,
                cfg.chunking.chunk_overlap
            );
            for c in &chunks {
                let preview: String = c.text.chars().take(60).collect();
                println!(
                    "  #{:<4} {:>5} chars  {}",
                    c.index,
                    c.text.chars().count(),
                    preview.replace('\n', " ")
                );
            }
        }
    }

    Ok(())
}
