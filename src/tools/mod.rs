//! Tool implementations for the Splunk MCP server.
//!
//! This module contains the actual implementations of the tools
//! exposed by the MCP server.

pub mod indexes;
pub mod query;

pub use indexes::*;
pub use query::*;
