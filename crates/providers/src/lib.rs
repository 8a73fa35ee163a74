//! Completion service implementations for Boardroom.
//!
//! All clients implement `boardroom_core::CompletionService`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use boardroom_config::AppConfig;
use boardroom_core::{Error, Result};
use std::sync::Arc;

/// Build the configured completion service.
///
/// Fails fast with a configuration error when no API key is available.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn boardroom_core::CompletionService>> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::Config {
            message: "No API key configured. Set BOARDROOM_API_KEY or api_key in config.toml".into(),
        })?;

    let provider = OpenAiCompatProvider::new("openai-compat", &config.api_url, api_key)?
        .with_timeout_secs(config.request_timeout_secs)?;
    Ok(Arc::new(provider))
}
