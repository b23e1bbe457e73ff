use super::models::ProcessorConfig;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Shared, swappable reference to the active processor configuration.
///
/// Readers take an `Arc` snapshot and keep it for the whole pass; `replace`
/// only affects snapshots taken afterwards.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<ProcessorConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current configuration
    pub async fn snapshot(&self) -> Arc<ProcessorConfig> {
        self.current.read().await.clone()
    }

    /// Swap in a new configuration for subsequent passes
    pub async fn replace(&self, config: ProcessorConfig) {
        let rules = config.rules.len();
        *self.current.write().await = Arc::new(config);
        info!(rules, "Processor configuration replaced");
    }
}

impl From<ProcessorConfig> for ConfigHandle {
    fn from(config: ProcessorConfig) -> Self {
        Self::new(config)
    }
}
