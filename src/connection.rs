//! Lazily established, process-wide Splunk session.

use crate::client::SplunkService;
use crate::config::SplunkConfig;
use crate::types::SplunkResult;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Owns the connection settings and the memoized [`SplunkService`]
///
/// The session is created on the first call to [`get_service`] and reused
/// for the lifetime of the manager. It is never refreshed. Concurrent first
/// calls wait on the same initialization; a failed attempt leaves the slot
/// empty so the next call tries again.
///
/// [`get_service`]: ConnectionManager::get_service
pub struct ConnectionManager {
    config: SplunkConfig,
    service: OnceCell<Arc<SplunkService>>,
}

impl ConnectionManager {
    /// Create a manager; no connection is made yet
    pub fn new(config: SplunkConfig) -> Self {
        Self {
            config,
            service: OnceCell::new(),
        }
    }

    /// Settings this manager connects with
    pub fn config(&self) -> &SplunkConfig {
        &self.config
    }

    /// Whether a session has been established
    pub fn is_connected(&self) -> bool {
        self.service.initialized()
    }

    /// Get the shared session, connecting if none exists yet
    pub async fn get_service(&self) -> SplunkResult<Arc<SplunkService>> {
        let service = self
            .service
            .get_or_try_init(|| async {
                info!(host = %self.config.host, port = self.config.port, "Creating Splunk session");
                SplunkService::connect(&self.config).await.map(Arc::new)
            })
            .await?;

        debug!("Splunk session ready");
        Ok(Arc::clone(service))
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}
