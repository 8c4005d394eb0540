//! # Splunk MCP - Splunk search tools over the Model Context Protocol
//!
//! An MCP server that lets AI agents run Splunk searches and list the indexes
//! they can read. It is usable both as a library and as a standalone CLI
//! binary.
//!
//! ## Features
//!
//! - **Search**: one-shot Splunk searches over a time window, results
//!   flattened into an ordered list of records
//! - **Index Listing**: names of all indexes the configured user can access
//! - **Lazy Connection**: the Splunk session is created on first use and
//!   shared by every later call
//! - **Dual Transport**: Support for both STDIO and HTTP (SSE) transports
//!
//! ## Quick Start
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use splunk_mcp::{SplunkMcpServer, TransportType};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = SplunkMcpServer::from_env()?;
//!     server.run(TransportType::Stdio).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Direct Tool Usage
//!
//! ```rust,no_run
//! use splunk_mcp::{ConnectionManager, SplunkConfig, tools::indexes};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = ConnectionManager::new(SplunkConfig::from_env()?);
//!     let names = indexes::get_indexes(&manager).await?;
//!     println!("{:?}", names);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`server`]: MCP server implementation with transport handling
//! - [`tools`]: The `run_splunk_query` and `get_indexes` tools
//! - [`connection`]: Lazily created, shared Splunk session
//! - [`client`]: Thin client for the Splunk management REST API
//! - [`config`]: Connection settings
//! - [`types`]: Common types, errors and schemas

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod connection;
pub mod server;
pub mod tools;
pub mod types;

// Re-export commonly used items at crate root
pub use client::SplunkService;
pub use config::{Credentials, Scheme, SplunkConfig};
pub use connection::ConnectionManager;
pub use server::{ServerConfig, SplunkMcpServer, TransportType};
pub use types::{
    DiagnosticRecord, RunQueryArgs, SearchRecord, SplunkError, SplunkResult,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name for MCP protocol
pub const SERVER_NAME: &str = "Splunk MCP server";

/// Server description
pub const SERVER_DESCRIPTION: &str = "Splunk search and index listing MCP server";

/// Usage notes sent to clients at initialization
pub const SERVER_INSTRUCTIONS: &str = "This is a Splunk MCP server that allows an AI agent to run Splunk queries and retrieve results.\n\
Use the `run_splunk_query` tool to execute Splunk queries.\n\
Use the `get_indexes` tool to list all accessible Splunk indexes.";
