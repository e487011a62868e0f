/// Core Server Framework Module
///
/// - config.rs: environment configuration read once at start-up
/// - error.rs: tool and configuration error types
/// - server.rs: MCP server implementation with HTTP and STDIO transport
/// - utils.rs: formatting helpers

pub mod config;
pub mod error;
pub mod server;
pub mod utils;
