//! MCP tool adapter.
//!
//! Exposes a single tool, `getTransportPolicy`, over the Model Context
//! Protocol on stdio. Each call is forwarded to the query service's
//! `POST /query` endpoint and the reply is returned twice: as a text
//! content item for display, and as `structuredContent` matching the
//! declared output schema. Both always carry the same answer.
//!
//! The adapter keeps no state between calls; the index lives in the
//! query service.
//!
//! # Client configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "transport-policy": {
//!       "command": "policy-rag",
//!       "args": ["--config", "/path/to/policy-rag.toml", "mcp"]
//!     }
//!   }
//! }
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::backend::{build_client, endpoint};
use crate::config::Config;

pub const TOOL_NAME: &str = "getTransportPolicy";

const TOOL_DESCRIPTION: &str = "Answer a question about the transport policy document. \
     The answer is generated only from passages retrieved from the document.";

/// HTTP client for the query service.
#[derive(Clone)]
pub struct RagClient {
    http: reqwest::Client,
    base_url: String,
}

impl RagClient {
    pub fn new(base_url: &str, timeout_secs: Option<u64>) -> Result<Self> {
        Ok(Self {
            http: build_client(timeout_secs)?,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `query` to `POST /query` and return the answer string.
    ///
    /// A non-2xx reply is an error carrying the status and body text.
    /// A non-string `answer` is serialized to JSON text rather than
    /// rejected.
    pub async fn ask(&self, query: &str) -> Result<String> {
        let url = endpoint(&self.base_url, "/query");
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("RAG service unreachable at {}: {}", url, e))?;

        let status = response.status();
        tracing::info!(%status, "received RAG service response");

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("RAG service returned HTTP {}: {}", status, body_text);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("RAG service returned a non-JSON body")?;
        answer_from_body(json)
    }
}

fn answer_from_body(mut json: serde_json::Value) -> Result<String> {
    match json.get_mut("answer").map(serde_json::Value::take) {
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(other) => {
            tracing::warn!("RAG service returned a non-string answer; coercing to string");
            Ok(serde_json::to_string(&other)?)
        }
        None => bail!("RAG service response has no 'answer' field: {}", json),
    }
}

/// MCP server exposing `getTransportPolicy`.
#[derive(Clone)]
pub struct PolicyToolServer {
    client: RagClient,
    tool: Arc<Tool>,
}

impl PolicyToolServer {
    pub fn new(client: RagClient) -> Self {
        Self {
            client,
            tool: Arc::new(policy_tool()),
        }
    }

    /// Execute the tool for already-received call arguments.
    ///
    /// Arguments that violate the input schema are a protocol error
    /// (`INVALID_PARAMS`). Backend failures are reported as a tool result
    /// with `is_error` set, so the client sees the message.
    pub async fn invoke(&self, arguments: Option<JsonObject>) -> Result<CallToolResult, McpError> {
        let query = parse_query(arguments)?;

        match self.client.ask(&query).await {
            Ok(answer) => Ok(answer_result(answer)),
            Err(e) => {
                tracing::error!(error = %e, "{} failed", TOOL_NAME);
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

/// Build the dual-representation success result.
fn answer_result(answer: String) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(answer.clone())]);
    result.structured_content = Some(serde_json::json!({ "answer": answer }));
    result
}

fn input_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "minLength": 1,
                "pattern": "\\S",
                "description": "The transport policy question to answer"
            }
        },
        "required": ["query"]
    })
}

fn output_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "answer": { "type": "string" }
        },
        "required": ["answer"]
    })
}

fn as_schema(value: serde_json::Value) -> Arc<JsonObject> {
    match value {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    }
}

fn policy_tool() -> Tool {
    Tool {
        name: Cow::Borrowed(TOOL_NAME),
        title: Some("Transport policy Q&A".to_string()),
        description: Some(Cow::Borrowed(TOOL_DESCRIPTION)),
        input_schema: as_schema(input_schema()),
        output_schema: Some(as_schema(output_schema())),
        annotations: Some(ToolAnnotations::new().read_only(true)),
        execution: None,
        icons: None,
        meta: None,
    }
}

/// Validate call arguments against the input schema and extract `query`.
fn parse_query(arguments: Option<JsonObject>) -> Result<String, McpError> {
    let args = arguments.unwrap_or_default();
    match args.get("query") {
        Some(serde_json::Value::String(q)) if !q.trim().is_empty() => Ok(q.clone()),
        Some(serde_json::Value::String(_)) => Err(McpError::invalid_params(
            "parameter 'query' must not be empty",
            None,
        )),
        Some(other) => Err(McpError::invalid_params(
            format!(
                "parameter 'query' must be of type 'string', got {}",
                json_type_name(other)
            ),
            None,
        )),
        None => Err(McpError::invalid_params(
            "missing required parameter: query",
            None,
        )),
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl ServerHandler for PolicyToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("Transport Policy RAG".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Use the {} tool to ask questions about the transport policy document. \
                 Answers come only from the document; unanswerable questions get an \
                 explicit \"don't know\" reply.",
                TOOL_NAME
            )),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(vec![self
            .tool
            .as_ref()
            .clone()])))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        (name == TOOL_NAME).then(|| self.tool.as_ref().clone())
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if request.name != TOOL_NAME {
            return Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            ));
        }
        self.invoke(request.arguments).await
    }
}

/// Serve the adapter on stdio until the client closes the stream.
pub async fn run_adapter(config: &Config) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    let client = RagClient::new(&config.adapter.rag_url, config.adapter.timeout_secs)?;
    tracing::info!(
        rag_url = client.base_url(),
        tool = TOOL_NAME,
        "starting MCP adapter on stdio"
    );

    let service = PolicyToolServer::new(client)
        .serve(stdio())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {}", e))?;

    let reason = service.waiting().await?;
    tracing::info!(?reason, "MCP adapter stopped");
    Ok(())
}
