//! MCP Server example
//!
//! Run with: cargo run --example mcp_server
//!
//! Splunk settings are read from SPLUNK_* environment variables.

use splunk_mcp::server::{DEFAULT_SSE_HOST, DEFAULT_SSE_PORT, ServerConfig, SplunkMcpServer, TransportType};
use splunk_mcp::SplunkConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with stdio JSON-RPC traffic
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig {
        splunk: SplunkConfig::from_env()?,
    };

    let server = SplunkMcpServer::new(config);

    // Choose transport based on environment
    let transport = if std::env::var("USE_SSE").is_ok() {
        eprintln!("Starting SSE server on http://0.0.0.0:{}", DEFAULT_SSE_PORT);
        TransportType::Sse {
            port: DEFAULT_SSE_PORT,
            host: DEFAULT_SSE_HOST,
        }
    } else {
        eprintln!("Starting STDIO server (for MCP clients)");
        TransportType::Stdio
    };

    server.run(transport).await?;

    Ok(())
}
