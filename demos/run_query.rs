//! Direct tool usage example
//!
//! Run with: cargo run --example run_query -- "search index=_internal | head 5"

use splunk_mcp::tools::{indexes, query};
use splunk_mcp::{ConnectionManager, RunQueryArgs, SearchRecord, SplunkConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let search = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "search index=_internal | head 5".to_string());

    let manager = ConnectionManager::new(SplunkConfig::from_env()?);

    println!("=== Indexes ===\n");
    for name in indexes::get_indexes(&manager).await? {
        println!("  - {}", name);
    }

    println!("\n=== Results for '{}' ===\n", search);
    let args = RunQueryArgs::new(search).with_window("-1h", "now");
    for record in query::run_query(&manager, &args).await? {
        match record {
            SearchRecord::Data(fields) => println!("{}", serde_json::Value::Object(fields)),
            SearchRecord::Diagnostic(d) => println!("[message] {}", d.message),
        }
    }

    Ok(())
}
