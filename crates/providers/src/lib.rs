//! Model-call provider implementations for Gridline.
//!
//! All providers implement the `gridline_core::Provider` trait.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use std::sync::Arc;
use std::time::Duration;

use gridline_config::AppConfig;
use gridline_core::error::ProviderError;
use gridline_core::provider::Provider;

/// Build the configured provider.
///
/// Fails with `NotConfigured` when no API key is available.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "no API key; set GRIDLINE_API_KEY or ANTHROPIC_API_KEY".into(),
        )
    })?;

    let mut provider =
        AnthropicProvider::new(api_key, Duration::from_secs(config.provider.timeout_secs))?;
    if let Some(url) = &config.provider.api_url {
        provider = provider.with_base_url(url);
    }

    Ok(Arc::new(provider))
}
