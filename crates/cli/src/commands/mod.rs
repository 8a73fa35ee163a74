pub mod agents;
pub mod extract;
pub mod onboard;
pub mod run;
pub mod tick;
pub mod workflow;

use boardroom_config::AppConfig;
use boardroom_core::profile::AgentRegistry;
use boardroom_memory::Stores;
use std::sync::Arc;
use tracing::warn;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub(crate) async fn open_stores(config: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    Ok(Stores::open(&config.storage)
        .await
        .map_err(|e| format!("Failed to open storage: {e}"))?)
}

/// The configured roster with any stored persona overrides applied.
pub(crate) async fn load_registry(config: &AppConfig, stores: &Stores) -> Arc<AgentRegistry> {
    let base = AgentRegistry::new(config.agents.clone());
    match base.load_overrides(stores.configs.as_ref()).await {
        Ok(patched) => Arc::new(patched),
        Err(e) => {
            warn!(error = %e, "Could not read agent overrides, using configured roster");
            Arc::new(base)
        }
    }
}
