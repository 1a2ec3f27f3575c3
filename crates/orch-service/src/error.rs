//! Error types for the orchestration service

use orch_provider::{ProviderError, ProviderKind};
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced by the orchestration service
///
/// Only the lower-level APIs (`generate_text`, admin operations) return
/// these; `analyze` converts every failure into a degraded report instead.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// All retries against every eligible provider failed
    #[error("all providers exhausted: {0}")]
    Exhausted(String),

    /// Startup found no provider passing its health check
    #[error("no healthy provider available")]
    NoHealthyProvider,

    /// Switch target failed its health check; current provider kept
    #[error("provider {0} failed health check, keeping current provider")]
    UnhealthyTarget(ProviderKind),

    /// Switch target is not configured
    #[error("provider {0} is not configured")]
    UnknownProvider(ProviderKind),

    /// New work rejected while draining
    #[error("service is shutting down")]
    ShuttingDown,

    /// Prompt template error
    #[error("template error: {0}")]
    Template(#[from] orch_prompt::PromptError),

    /// Hard budget cap is enforced and exhausted
    #[error("budget exhausted: {0}")]
    BudgetExhausted(String),

    /// Invalid service configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Other(err.to_string())
    }
}
