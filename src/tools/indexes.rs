//! `get_indexes` tool.

use crate::connection::ConnectionManager;
use crate::types::SplunkResult;
use tracing::instrument;

/// List the names of all indexes the configured user can access
///
/// Names are returned in the order Splunk reports them.
#[instrument(skip(manager))]
pub async fn get_indexes(manager: &ConnectionManager) -> SplunkResult<Vec<String>> {
    let service = manager.get_service().await?;
    service.list_indexes().await
}
