//! `run_splunk_query` tool.
//!
//! Runs a one-shot search over a time window and returns its output as a
//! flat, ordered list of records.

use crate::connection::ConnectionManager;
use crate::types::{RunQueryArgs, SearchRecord, SplunkResult};
use tracing::{info, instrument};

/// Run a Splunk search and collect its results
///
/// Blank queries are rejected before any connection is attempted. Errors
/// from Splunk are returned unchanged.
///
/// # Example
///
/// ```rust,no_run
/// use splunk_mcp::{ConnectionManager, RunQueryArgs, SplunkConfig, tools::query::run_query};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let manager = ConnectionManager::new(SplunkConfig::from_env()?);
///     let args = RunQueryArgs::new("search index=_internal | head 5");
///     let records = run_query(&manager, &args).await?;
///     println!("Got {} records", records.len());
///     Ok(())
/// }
/// ```
#[instrument(skip(manager), fields(query = %args.query))]
pub async fn run_query(
    manager: &ConnectionManager,
    args: &RunQueryArgs,
) -> SplunkResult<Vec<SearchRecord>> {
    args.validate()?;

    let service = manager.get_service().await?;

    info!(
        earliest_time = %args.earliest_time,
        latest_time = %args.latest_time,
        "Running one-shot search"
    );

    service
        .oneshot(&args.query, &args.earliest_time, &args.latest_time)
        .await
}
