//! Common types and data structures used throughout the server.
//!
//! This module contains all the shared types including:
//! - Tool arguments and result records
//! - Error types
//! - JSON schemas for the MCP tool definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type alias for Splunk MCP operations
pub type SplunkResult<T> = Result<T, SplunkError>;

/// Default earliest time bound for searches
pub const DEFAULT_EARLIEST_TIME: &str = "-24h";

/// Default latest time bound for searches
pub const DEFAULT_LATEST_TIME: &str = "now";

/// Errors that can occur while serving Splunk tools
#[derive(Error, Debug)]
pub enum SplunkError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Connection settings are missing or malformed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid arguments provided
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Splunk answered with a non-success status
    #[error("Splunk returned HTTP {status}: {message}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Messages reported by Splunk, or the raw body
        message: String,
    },

    /// Splunk answered successfully but the body was not what we expected
    #[error("Unexpected response from Splunk: {0}")]
    UnexpectedResponse(String),

    /// Server error
    #[error("Server error: {0}")]
    ServerError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Arguments for the `run_splunk_query` tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunQueryArgs {
    /// The Splunk search query to run
    pub query: String,

    /// Earliest time bound (e.g. "-24h", "-7d@d", an epoch)
    #[serde(default = "default_earliest_time")]
    pub earliest_time: String,

    /// Latest time bound
    #[serde(default = "default_latest_time")]
    pub latest_time: String,
}

impl RunQueryArgs {
    /// Build arguments for `query` over the default window (last 24 hours)
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            earliest_time: default_earliest_time(),
            latest_time: default_latest_time(),
        }
    }

    /// Override the time window
    pub fn with_window(mut self, earliest: impl Into<String>, latest: impl Into<String>) -> Self {
        self.earliest_time = earliest.into();
        self.latest_time = latest.into();
        self
    }

    /// Reject queries that are blank after trimming
    pub fn validate(&self) -> SplunkResult<()> {
        if self.query.trim().is_empty() {
            return Err(SplunkError::InvalidArguments(
                "Query cannot be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_earliest_time() -> String {
    DEFAULT_EARLIEST_TIME.to_string()
}

fn default_latest_time() -> String {
    DEFAULT_LATEST_TIME.to_string()
}

/// A warning or error reported by Splunk alongside search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    /// Message text as reported by Splunk
    pub message: String,
}

/// One item of a search result stream
///
/// Serializes untagged: data records as their field mapping, diagnostics as
/// `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchRecord {
    /// A matched event: field name to value
    Data(Map<String, Value>),
    /// A message surfaced by the search engine
    Diagnostic(DiagnosticRecord),
}

impl SearchRecord {
    /// Create a diagnostic record
    pub fn diagnostic(message: impl Into<String>) -> Self {
        SearchRecord::Diagnostic(DiagnosticRecord {
            message: message.into(),
        })
    }

    /// Whether this record is a diagnostic
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, SearchRecord::Diagnostic(_))
    }
}

/// JSON Schema for `run_splunk_query` arguments (used for MCP tool definition)
pub fn run_query_args_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The Splunk search query to run"
            },
            "earliest_time": {
                "type": "string",
                "description": "The earliest time for the search",
                "default": DEFAULT_EARLIEST_TIME
            },
            "latest_time": {
                "type": "string",
                "description": "The latest time for the search",
                "default": DEFAULT_LATEST_TIME
            }
        },
        "required": ["query"]
    })
}

/// JSON Schema for `get_indexes` arguments
pub fn get_indexes_args_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}
