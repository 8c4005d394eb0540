//! MCP server implementation.
//!
//! This module provides the core MCP server implementation that handles
//! tool requests and manages communication via STDIO or SSE transports.

use crate::config::SplunkConfig;
use crate::connection::ConnectionManager;
use crate::tools::{indexes, query};
use crate::types::{
    RunQueryArgs, SearchRecord, SplunkError, SplunkResult, get_indexes_args_schema,
    run_query_args_schema,
};
use crate::{SERVER_INSTRUCTIONS, SERVER_NAME, VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
#[cfg(feature = "stdio")]
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, instrument};

/// MCP Protocol version
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name of the search tool
pub const RUN_QUERY_TOOL: &str = "run_splunk_query";

/// Name of the index listing tool
pub const GET_INDEXES_TOOL: &str = "get_indexes";

/// Default bind address for the SSE transport
pub const DEFAULT_SSE_HOST: [u8; 4] = [0, 0, 0, 0];

/// Default port for the SSE transport
pub const DEFAULT_SSE_PORT: u16 = 8081;

/// Path of the SSE event stream
pub const SSE_PATH: &str = "/sse";

/// Path clients post JSON-RPC messages to
pub const RPC_PATH: &str = "/rpc";

/// Transport type for the MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportType {
    /// Standard input/output transport
    #[default]
    Stdio,
    /// Server-Sent Events over HTTP
    Sse {
        /// Port to listen on
        port: u16,
        /// Host to bind to
        host: [u8; 4],
    },
}

/// Configuration for the server
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Splunk connection settings
    pub splunk: SplunkConfig,
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID (None for notifications)
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Notifications carry no id and get no reply
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Success result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Tool result carrying a single text item
    fn tool_text(id: Option<Value>, text: String, is_error: bool) -> Self {
        Self::success(
            id,
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": is_error
            }),
        )
    }
}

/// MCP Tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: Option<String>,
    /// JSON Schema for input
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Fixed liveness payload, independent of the Splunk connection
pub fn health_status() -> Value {
    json!({ "status": "healthy" })
}

/// Tool handler implementation
#[derive(Clone)]
pub struct SplunkHandler {
    /// Lazily connected Splunk session
    connections: Arc<ConnectionManager>,
}

impl SplunkHandler {
    /// Create a new handler; Splunk is not contacted until a tool runs
    pub fn new(config: ServerConfig) -> Self {
        Self {
            connections: Arc::new(ConnectionManager::new(config.splunk)),
        }
    }

    /// Get server information for initialization
    pub fn get_server_info(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": VERSION
            },
            "instructions": SERVER_INSTRUCTIONS
        })
    }

    /// List available tools
    pub fn list_tools(&self) -> Vec<McpTool> {
        vec![
            McpTool {
                name: RUN_QUERY_TOOL.to_string(),
                description: Some(
                    "Run a Splunk query and return the results. Results are a list of event field mappings; warnings and errors reported by Splunk appear as {\"message\": ...} entries."
                        .to_string(),
                ),
                input_schema: run_query_args_schema(),
            },
            McpTool {
                name: GET_INDEXES_TOOL.to_string(),
                description: Some("Lists all accessible Splunk indexes.".to_string()),
                input_schema: get_indexes_args_schema(),
            },
        ]
    }

    /// Execute the search tool
    #[instrument(skip(self))]
    pub async fn execute_query(&self, args: RunQueryArgs) -> SplunkResult<Vec<SearchRecord>> {
        query::run_query(&self.connections, &args).await
    }

    /// Execute the index listing tool
    #[instrument(skip(self))]
    pub async fn execute_get_indexes(&self) -> SplunkResult<Vec<String>> {
        indexes::get_indexes(&self.connections).await
    }

    /// Handle a JSON-RPC request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "Handling request");

        match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(request.id, self.get_server_info()),

            "initialized" | "notifications/initialized" => {
                // Notification acknowledgment
                JsonRpcResponse::success(request.id, json!({}))
            },

            "tools/list" => {
                let tools = self.list_tools();
                JsonRpcResponse::success(request.id, json!({ "tools": tools }))
            },

            "tools/call" => {
                let params = match request.params {
                    Some(p) => p,
                    None => {
                        return JsonRpcResponse::error(
                            request.id,
                            -32602,
                            "Missing parameters".to_string(),
                        );
                    },
                };

                let tool_name = params
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

                self.call_tool(request.id, tool_name, arguments).await
            },

            "ping" => JsonRpcResponse::success(request.id, json!({})),

            _ => JsonRpcResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    /// Call a specific tool
    async fn call_tool(&self, id: Option<Value>, name: &str, arguments: Value) -> JsonRpcResponse {
        info!(tool = %name, "Executing tool");

        match name {
            RUN_QUERY_TOOL => {
                let args: RunQueryArgs = match serde_json::from_value(arguments) {
                    Ok(a) => a,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            -32602,
                            format!("Invalid query arguments: {}", e),
                        );
                    },
                };

                match self.execute_query(args).await {
                    Ok(records) => {
                        let text = serde_json::to_string_pretty(&records).unwrap_or_default();
                        JsonRpcResponse::tool_text(id, text, false)
                    },
                    Err(e) => {
                        error!(error = %e, "Query failed");
                        JsonRpcResponse::tool_text(id, format!("Query failed: {}", e), true)
                    },
                }
            },

            GET_INDEXES_TOOL => match self.execute_get_indexes().await {
                Ok(names) => {
                    let text = serde_json::to_string_pretty(&names).unwrap_or_default();
                    JsonRpcResponse::tool_text(id, text, false)
                },
                Err(e) => {
                    error!(error = %e, "Listing indexes failed");
                    JsonRpcResponse::tool_text(id, format!("Failed to list indexes: {}", e), true)
                },
            },

            _ => JsonRpcResponse::error(id, -32601, format!("Unknown tool: {}", name)),
        }
    }

    /// Get the connection manager
    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }
}

#[cfg(feature = "sse")]
mod sse {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Query, State},
        http::StatusCode,
        response::{
            IntoResponse, Response,
            sse::{Event, KeepAlive, Sse},
        },
        routing::{get, post},
    };
    use futures::stream::{self, Stream, StreamExt};
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use tokio::sync::mpsc;
    use tower_http::{cors::CorsLayer, trace::TraceLayer};
    use uuid::Uuid;

    /// Responses queued per session before posts start waiting
    const SESSION_BUFFER: usize = 32;

    type SessionMap = HashMap<String, mpsc::Sender<JsonRpcResponse>>;
    type Sessions = Arc<Mutex<SessionMap>>;

    #[derive(Clone)]
    struct AppState {
        handler: Arc<SplunkHandler>,
        sessions: Sessions,
    }

    #[derive(Debug, Deserialize)]
    struct RpcQuery {
        session_id: Option<String>,
    }

    fn lock(sessions: &Sessions) -> MutexGuard<'_, SessionMap> {
        sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unregisters the session once its event stream is dropped
    struct SessionGuard {
        id: String,
        sessions: Sessions,
    }

    impl Drop for SessionGuard {
        fn drop(&mut self) {
            lock(&self.sessions).remove(&self.id);
            info!(session = %self.id, "SSE session closed");
        }
    }

    /// HTTP routes for the SSE transport
    ///
    /// `GET /sse` opens a session: the first event (`endpoint`) names the URL
    /// to post JSON-RPC messages to, and every response to those posts is
    /// delivered on the same stream as a `message` event. Posts to `/rpc`
    /// without a `session_id` are answered directly in the HTTP body.
    pub fn router(handler: Arc<SplunkHandler>) -> Router {
        let state = AppState {
            handler,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        };

        Router::new()
            .route("/health", get(health))
            .route(SSE_PATH, get(sse_handler))
            .route(RPC_PATH, post(rpc_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    async fn health() -> Json<Value> {
        Json(health_status())
    }

    async fn sse_handler(
        State(state): State<AppState>,
    ) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
        let id = Uuid::new_v4().simple().to_string();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        lock(&state.sessions).insert(id.clone(), tx);
        info!(session = %id, "SSE session opened");

        let endpoint = Event::default()
            .event("endpoint")
            .data(format!("{}?session_id={}", RPC_PATH, id));
        let guard = SessionGuard {
            id,
            sessions: state.sessions,
        };

        let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
            let response: JsonRpcResponse = rx.recv().await?;
            let event = Event::default().event("message").json_data(&response);
            Some((event, (rx, guard)))
        });

        let events = stream::once(async move { Ok::<_, axum::Error>(endpoint) }).chain(messages);
        Sse::new(events).keep_alive(KeepAlive::default())
    }

    async fn rpc_handler(
        State(state): State<AppState>,
        Query(query): Query<RpcQuery>,
        Json(request): Json<JsonRpcRequest>,
    ) -> Response {
        let notification = request.is_notification();

        let Some(session_id) = query.session_id else {
            let response = state.handler.handle_request(request).await;
            return if notification {
                StatusCode::ACCEPTED.into_response()
            } else {
                Json(response).into_response()
            };
        };

        let sender = lock(&state.sessions).get(&session_id).cloned();
        let Some(tx) = sender else {
            return (
                StatusCode::NOT_FOUND,
                format!("Unknown session: {}", session_id),
            )
                .into_response();
        };

        let handler = state.handler.clone();
        tokio::spawn(async move {
            let response = handler.handle_request(request).await;
            if notification {
                return;
            }
            if tx.send(response).await.is_err() {
                debug!(session = %session_id, "Session closed before the response was sent");
            }
        });

        StatusCode::ACCEPTED.into_response()
    }
}

#[cfg(feature = "sse")]
#[cfg_attr(docsrs, doc(cfg(feature = "sse")))]
pub use sse::router;

/// Main MCP server
pub struct SplunkMcpServer {
    handler: SplunkHandler,
}

impl SplunkMcpServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            handler: SplunkHandler::new(config),
        }
    }

    /// Create a server configured from the process environment
    pub fn from_env() -> SplunkResult<Self> {
        Ok(Self::new(ServerConfig {
            splunk: SplunkConfig::from_env()?,
        }))
    }

    /// Get the request handler
    pub fn handler(&self) -> &SplunkHandler {
        &self.handler
    }

    /// Run the server with the specified transport
    #[instrument(skip(self))]
    pub async fn run(self, transport: TransportType) -> SplunkResult<()> {
        info!(
            server = SERVER_NAME,
            version = VERSION,
            "Starting Splunk MCP server"
        );

        match transport {
            #[cfg(feature = "stdio")]
            TransportType::Stdio => self.run_stdio().await,
            #[cfg(feature = "sse")]
            TransportType::Sse { port, host } => self.run_sse(host, port).await,
            #[allow(unreachable_patterns)]
            other => Err(SplunkError::ServerError(format!(
                "{:?} transport is not enabled in this build",
                other
            ))),
        }
    }

    /// Run the server with STDIO transport
    #[cfg(feature = "stdio")]
    async fn run_stdio(self) -> SplunkResult<()> {
        info!("Starting STDIO transport");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        // Process JSON-RPC messages line by line
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            debug!(request = %line, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => {
                    let notification = request.is_notification();
                    let response = self.handler.handle_request(request).await;
                    if notification {
                        continue;
                    }
                    response
                },
                Err(e) => JsonRpcResponse::error(None, -32700, format!("Parse error: {}", e)),
            };

            let response_str = serde_json::to_string(&response)?;
            debug!(response = %response_str, "Sending response");
            stdout.write_all(response_str.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        info!("STDIO server stopped");
        Ok(())
    }

    /// Run the server with SSE transport
    #[cfg(feature = "sse")]
    async fn run_sse(self, host: [u8; 4], port: u16) -> SplunkResult<()> {
        info!(host = ?host, port = port, "Starting SSE transport");

        let app = router(Arc::new(self.handler));
        let addr = std::net::SocketAddr::from((host, port));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| SplunkError::ServerError(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("SSE server listening on http://{}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| SplunkError::ServerError(format!("Server error: {}", e)))?;

        Ok(())
    }
}
