/// MCP Server Implementation
///
/// This module contains the core MCP server implementation including:
/// - JSON-RPC 2.0 request/response structures
/// - Tool registry with async tool handlers
/// - HTTP server setup with Actix Web
/// - STDIO server implementation for line-based communication
/// - Request handlers for MCP protocol methods

use actix_web::{
    web, App, HttpRequest, HttpResponse, HttpServer,
    error::{InternalError, JsonPayloadError},
    middleware::{Compress, DefaultHeaders, Logger},
};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::api::energy::EnergyPriceApi;
use crate::api::weather::WeatherApi;
use crate::core::config::Config;
use crate::core::error::ToolError;
use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const INVALID_PARAMS: i32 = -32602;
const METHOD_NOT_FOUND: i32 = -32601;

/// JSON-RPC 2.0 request structure for MCP protocol.
///
/// id is None for notifications; params carries method-specific parameters.
#[derive(Deserialize, Debug, Clone)]
pub struct MCPRequest {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC 2.0 response structure for MCP protocol.
///
/// Exactly one of result or error is present.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MCPResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<MCPError>,
}

impl MCPResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(MCPError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// JSON-RPC 2.0 error structure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MCPError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// MCP tool definition as published by tools/list.
#[derive(Serialize, Debug, Clone)]
pub struct MCPTool {
    /// Unique tool identifier (e.g., "get_weather_data")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Future returned by a tool handler: rendered text or a tool error.
pub type ToolFuture = BoxFuture<'static, Result<String, ToolError>>;

/// Tool handler function type definition.
///
/// Handlers receive the JSON arguments and return a boxed future so they can
/// perform outbound HTTP calls. They must be Send + Sync to be shared between
/// HTTP worker threads.
pub type ToolHandler = Box<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Registry of available MCP tools.
///
/// Keeps tool definitions in registration order for discovery and a map of
/// tool names to handlers for execution.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<MCPTool>,
    handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later registration under the same name replaces the handler.
    pub fn register(&mut self, tool: MCPTool, handler: ToolHandler) {
        let name = tool.name.clone();
        self.tools.retain(|t| t.name != name);
        self.tools.push(tool);
        self.handlers.insert(name, handler);
    }

    pub fn tools(&self) -> &[MCPTool] {
        &self.tools
    }

    /// Invoke the tool registered under `name` with `arguments`.
    pub async fn handle_tool_call(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        handler(arguments).await
    }
}

/// Initialize and register all tools.
///
/// Components are constructed from the immutable configuration and share a
/// single HTTP client.
pub fn initialize_tools(config: &Config, http: reqwest::Client) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    tools::weather::register(&mut registry, WeatherApi::new(&config.weather, http.clone()));
    tools::energy::register(&mut registry, EnergyPriceApi::new(&config.energy, http));

    registry
}

/// Transport-independent MCP request handling.
///
/// Cloning is cheap; the registry is shared.
#[derive(Clone)]
pub struct McpServer {
    server_name: String,
    server_version: String,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(config: &Config, registry: ToolRegistry) -> Self {
        Self {
            server_name: config.server_name.clone(),
            server_version: config.server_version.clone(),
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Route a request to its method handler.
    ///
    /// Returns None for notifications (requests without an id), which never
    /// receive a response.
    pub async fn handle_request(&self, req: MCPRequest) -> Option<MCPResponse> {
        if req.id.is_none() {
            debug!(method = %req.method, "Notification received");
            return None;
        }

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id),
            "ping" => MCPResponse::success(req.id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            _ => MCPResponse::failure(
                req.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", req.method),
            ),
        };
        Some(response)
    }

    /// Handle MCP initialize method.
    fn handle_initialize(&self, id: Option<Value>) -> MCPResponse {
        MCPResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version
                }
            }),
        )
    }

    /// Handle MCP tools/list method.
    fn handle_tools_list(&self, id: Option<Value>) -> MCPResponse {
        MCPResponse::success(id, serde_json::json!({ "tools": self.registry.tools() }))
    }

    /// Handle MCP tools/call method.
    ///
    /// Unknown tools are protocol-level errors; invalid arguments are reported
    /// as a tool result with isError set, so the assistant can see and correct
    /// them.
    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> MCPResponse {
        let Some(params) = params else {
            return MCPResponse::failure(id, INVALID_PARAMS, "Invalid params");
        };

        let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
            return MCPResponse::failure(id, INVALID_PARAMS, "Invalid params: missing tool name");
        };

        let arguments = params
            .get("arguments")
            .cloned()
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| serde_json::json!({}));

        info!(tool = tool_name, "Tool call");

        match self.registry.handle_tool_call(tool_name, arguments).await {
            Ok(text) => MCPResponse::success(id, tool_content(text, false)),
            Err(e @ ToolError::UnknownTool(_)) => {
                warn!(tool = tool_name, "Unknown tool requested");
                MCPResponse::failure(id, METHOD_NOT_FOUND, e.to_string())
            }
            Err(e @ ToolError::InvalidArguments(_)) => {
                warn!(tool = tool_name, error = %e, "Invalid tool arguments");
                MCPResponse::success(id, tool_content(format!("Error: {e}"), true))
            }
        }
    }
}

fn tool_content(text: String, is_error: bool) -> Value {
    serde_json::json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "isError": is_error
    })
}

/// Service description returned by GET /.
async fn service_info(server: web::Data<McpServer>) -> HttpResponse {
    let tools: Vec<&str> = server.registry().tools().iter().map(|t| t.name.as_str()).collect();
    HttpResponse::Ok().json(serde_json::json!({
        "service": server.server_name,
        "status": "running",
        "tools": tools,
        "version": server.server_version
    }))
}

/// MCP JSON-RPC request handler for HTTP mode.
async fn mcp_handler(server: web::Data<McpServer>, req: web::Json<MCPRequest>) -> HttpResponse {
    match server.handle_request(req.into_inner()).await {
        Some(response) => HttpResponse::Ok().json(response),
        None => HttpResponse::Accepted().finish(),
    }
}

/// Malformed request bodies get a JSON-RPC parse error instead of a bare 400.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::Ok().json(MCPResponse::failure(
        None,
        PARSE_ERROR,
        format!("Parse error: {err}"),
    ));
    InternalError::from_response(err, response).into()
}

/// Register the MCP routes on an Actix app.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/mcp", web::post().to(mcp_handler))
        .route("/", web::post().to(mcp_handler))
        .route("/", web::get().to(service_info));
}

/// Run the MCP server in HTTP mode.
///
/// Worker count, bind address and port come from the configuration. Request
/// logging goes through the Actix Logger middleware into tracing.
pub async fn run_server_http(server: McpServer, config: &Config) -> std::io::Result<()> {
    use std::time::Duration;

    let bind_addr = config.bind_addr();
    let workers = config.workers;
    let server = web::Data::new(server);

    info!(
        name = %config.server_name,
        version = %config.server_version,
        bind = %bind_addr,
        workers,
        "MCP Server starting (HTTP mode)"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(server.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY")),
            )
            // %r = request line, %s = status, %D = duration in milliseconds
            .wrap(Logger::new("%r %s %Dms"))
            .configure(configure_routes)
    })
    .workers(workers)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the MCP server in STDIO mode.
///
/// Reads JSON-RPC requests line-by-line from stdin and writes responses to
/// stdout. Logging goes to stderr so the protocol stream stays clean.
pub async fn run_server_stdio(server: McpServer) -> std::io::Result<()> {
    use tokio::io::{BufReader, BufWriter};

    info!(
        name = %server.server_name,
        version = %server.server_version,
        "MCP Server starting (STDIO mode)"
    );

    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    serve_lines(&server, stdin, stdout).await
}

/// Line-delimited JSON-RPC loop over any reader/writer pair.
///
/// One request per line, one response per line, flushed after every response.
/// Processing is sequential.
pub async fn serve_lines<R, W>(server: &McpServer, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<MCPRequest>(&line) {
            Ok(req) => server.handle_request(req).await,
            Err(e) => {
                warn!(error = %e, "Parse error");
                // Answer only when an id can be recovered from the line
                serde_json::from_str::<Value>(&line)
                    .ok()
                    .and_then(|partial| partial.get("id").cloned())
                    .map(|id| MCPResponse::failure(Some(id), PARSE_ERROR, format!("Parse error: {e}")))
            }
        };

        let Some(response) = response else {
            continue;
        };

        let response_json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Error serializing response");
                continue;
            }
        };

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use serde_json::json;

    fn demo_server() -> McpServer {
        let config = Config::default();
        McpServer::new(&config, initialize_tools(&config, reqwest::Client::new()))
    }

    fn request(id: Option<Value>, method: &str, params: Option<Value>) -> MCPRequest {
        MCPRequest {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    fn text_of(response: &MCPResponse) -> &str {
        response.result.as_ref().unwrap()["content"][0]["text"].as_str().unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let resp = demo_server()
            .handle_request(request(Some(json!(1)), "initialize", None))
            .await
            .unwrap();

        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "homegenie-mcp");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_publishes_exactly_two_tools() {
        let resp = demo_server()
            .handle_request(request(Some(json!(2)), "tools/list", None))
            .await
            .unwrap();

        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["get_weather_data", "get_energy_prices"]);
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["location"]));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_protocol_error() {
        let resp = demo_server()
            .handle_request(request(
                Some(json!(3)),
                "tools/call",
                Some(json!({ "name": "get_stock_quote", "arguments": {} })),
            ))
            .await
            .unwrap();

        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert!(err.message.contains("get_stock_quote"));
    }

    #[tokio::test]
    async fn missing_location_is_reported_as_tool_error() {
        let resp = demo_server()
            .handle_request(request(
                Some(json!(4)),
                "tools/call",
                Some(json!({ "name": "get_weather_data" })),
            ))
            .await
            .unwrap();

        assert_eq!(resp.result.as_ref().unwrap()["isError"], json!(true));
        assert!(text_of(&resp).contains("location"));
    }

    #[tokio::test]
    async fn demo_mode_tool_calls_succeed() {
        let server = demo_server();

        let weather = server
            .handle_request(request(
                Some(json!(5)),
                "tools/call",
                Some(json!({ "name": "get_weather_data", "arguments": { "location": "Berlin" } })),
            ))
            .await
            .unwrap();
        assert_eq!(weather.result.as_ref().unwrap()["isError"], json!(false));
        assert!(text_of(&weather).contains("Berlin"));
        assert!(text_of(&weather).contains("demo data"));

        let energy = server
            .handle_request(request(
                Some(json!(6)),
                "tools/call",
                Some(json!({ "name": "get_energy_prices", "arguments": { "include_forecast": true } })),
            ))
            .await
            .unwrap();
        assert!(text_of(&energy).contains("Energy Prices for EU"));
        assert!(text_of(&energy).contains("Next 8 Hours Forecast"));
        assert!(text_of(&energy).contains("demo data"));
    }

    #[tokio::test]
    async fn tools_call_without_params_is_invalid() {
        let resp = demo_server()
            .handle_request(request(Some(json!(7)), "tools/call", None))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_and_notifications() {
        let server = demo_server();

        let resp = server
            .handle_request(request(Some(json!("a")), "resources/list", None))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let none = server
            .handle_request(request(None, "notifications/initialized", None))
            .await;
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn stdio_loop_answers_each_request_line() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":42}"#, "\n",
            "not json at all\n",
        );
        let mut output: Vec<u8> = Vec::new();

        serve_lines(&demo_server(), input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<MCPResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, Some(json!(1)));
        assert_eq!(responses[1].result, Some(json!({})));
        assert_eq!(responses[2].id, Some(json!(3)));
        assert_eq!(responses[2].error.as_ref().unwrap().code, PARSE_ERROR);
    }

    #[actix_rt::test]
    async fn http_transport_round_trip() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(demo_server()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/mcp")
            .set_json(json!({
                "jsonrpc": "2.0",
                "id": 10,
                "method": "tools/call",
                "params": { "name": "get_energy_prices", "arguments": { "region": "UK" } }
            }))
            .to_request();
        let resp: MCPResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.id, Some(json!(10)));
        assert!(text_of(&resp).contains("Energy Prices for UK"));

        let req = test::TestRequest::get().uri("/").to_request();
        let info: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(info["status"], "running");
        assert_eq!(info["tools"], json!(["get_weather_data", "get_energy_prices"]));
    }

    #[actix_rt::test]
    async fn http_transport_rejects_malformed_body_with_parse_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(demo_server()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp: MCPResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }
}
