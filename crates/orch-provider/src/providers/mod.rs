//! Concrete provider adapter implementations

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;

use crate::{ModelProvider, ProviderConfig, Result};
use std::sync::Arc;

/// Build the adapter matching a validated [`ProviderConfig`]
///
/// Fails when the matching adapter feature is not compiled in.
pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn ModelProvider>> {
    config.validate()?;
    match config.kind {
        #[cfg(feature = "anthropic")]
        crate::ProviderKind::Anthropic => Ok(Arc::new(AnthropicProvider::new(config.clone())?)),
        #[cfg(feature = "openai")]
        crate::ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        #[allow(unreachable_patterns)]
        kind => Err(crate::ProviderError::Configuration(format!(
            "support for {kind} is not compiled into this build"
        ))),
    }
}
