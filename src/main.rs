/// HomeGenie MCP Server Entry Point
///
/// Loads the configuration from environment variables, sets up logging on
/// stderr, builds the weather and energy tools, and serves MCP over the
/// selected transport (see `core::config` for the variables).

mod api;
mod core;
mod model;
mod tools;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::core::config::{Config, TransportMode};
use crate::core::server::{self, McpServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_logging(&config);

    for (name, upstream) in [("weather", &config.weather), ("energy", &config.energy)] {
        if upstream.is_live() {
            info!(api = name, url = %upstream.base_url, "Live mode");
        } else {
            info!(api = name, "No API key configured, serving demo data");
        }
    }

    let http = api::http_client(&config).context("Failed to build HTTP client")?;
    let registry = server::initialize_tools(&config, http);
    let tool_names: Vec<&str> = registry.tools().iter().map(|t| t.name.as_str()).collect();
    info!(tools = ?tool_names, transport = %config.transport, "HomeGenie MCP Server starting");
    let mcp = McpServer::new(&config, registry);

    match config.transport {
        TransportMode::Stdio => server::run_server_stdio(mcp).await?,
        TransportMode::Http => server::run_server_http(mcp, &config).await?,
        TransportMode::Both => {
            // STDIO in the background, HTTP in the foreground
            let stdio = mcp.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = server::run_server_stdio(stdio).await {
                    error!(error = %e, "STDIO server error");
                }
            });

            let http_result = server::run_server_http(mcp, &config).await;
            stdio_handle.abort();
            http_result?
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Log to stderr; stdout carries the JSON-RPC stream in STDIO mode.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
