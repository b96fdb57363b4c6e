//! HTTP query service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Answer a question from the indexed document |
//! | `GET`  | `/health` | Health check (version and chunk count) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "Missing query" }
//! ```
//!
//! `400` when the request has no usable `query`, `500` with the failure
//! message when retrieval or generation fails. A failed query never
//! takes the server down.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::generation::create_chat_model;
use crate::rag::{RagError, RagService};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    rag: Arc<RagService>,
}

/// Starts the query service.
///
/// Builds the index first; the listener on `[server].bind` is only bound
/// once the index is complete, so no query can observe a partial index.
/// Startup errors (missing document, unreachable embedding backend) are
/// returned before anything listens.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let embedder = create_embedder(&config.embedding).await?;
    let chat = create_chat_model(&config.generation)?;

    let rag = RagService::build(config, embedder, chat).await?;
    serve(Arc::new(rag), &config.server.bind).await
}

/// Bind `bind_addr` and serve `rag` until the process is terminated.
pub async fn serve(rag: Arc<RagService>, bind_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(
        "query service listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(rag)).await?;

    Ok(())
}

/// Build the router. Public so tests can serve it on an ephemeral port.
pub fn router(rag: Arc<RagService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { rag })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn missing_query() -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: "Missing query".to_string(),
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::EmptyQuery => missing_query(),
            RagError::Backend(_) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
            },
        }
    }
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

/// Handler for `POST /query`.
///
/// The body is parsed by hand so that malformed JSON, a missing field and
/// a non-string field all produce the same `400 Missing query`.
async fn handle_query(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<QueryResponse>, AppError> {
    let query = serde_json::from_slice::<QueryRequest>(&body)
        .ok()
        .and_then(|r| r.query)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(missing_query)?;

    match state.rag.answer(&query).await {
        Ok(answer) => Ok(Json(QueryResponse { answer })),
        Err(err) => {
            tracing::error!(error = %err, "query failed");
            Err(err.into())
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    chunks: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chunks: state.rag.index().len(),
    })
}
