//! Error types for provider operations

use thiserror::Error;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while talking to a model backend
///
/// Variants fall into two classes: transient failures (network trouble,
/// timeouts, rate limits, backend 5xx) that a retry policy may attempt again,
/// and fatal failures (authentication, malformed requests) that must surface
/// immediately. [`ProviderError::is_transient`] encodes the split.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Request exceeded its own timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Network-level failure (connect, DNS, broken transfer)
    #[error("network error: {0}")]
    Network(String),

    /// Rate limit exceeded on the backend
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Backend returned a server-side error
    #[error("provider server error: {0}")]
    ServerError(String),

    /// Invalid API key or authentication failed
    #[error("invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Request was rejected as malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested model does not exist on the backend
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Response body did not match the expected shape
    #[error("unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Whether a retry policy is allowed to attempt this request again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout(_)
                | ProviderError::Network(_)
                | ProviderError::RateLimited(_)
                | ProviderError::ServerError(_)
        )
    }

    /// Fatal errors must not be retried
    pub fn is_fatal(&self) -> bool {
        !self.is_transient()
    }
}

#[cfg(any(feature = "anthropic", feature = "openai"))]
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Timeout("30s".to_string()).is_transient());
        assert!(ProviderError::Network("connection reset".to_string()).is_transient());
        assert!(ProviderError::RateLimited("429".to_string()).is_transient());
        assert!(ProviderError::ServerError("HTTP 503".to_string()).is_transient());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ProviderError::AuthenticationFailed.is_fatal());
        assert!(ProviderError::InvalidRequest("bad field".to_string()).is_fatal());
        assert!(ProviderError::ModelNotFound("gpt-0".to_string()).is_fatal());
        assert!(ProviderError::Configuration("missing key".to_string()).is_fatal());
    }

    #[test]
    fn test_classes_are_disjoint() {
        let transient = ProviderError::Timeout("t".to_string());
        let fatal = ProviderError::AuthenticationFailed;
        assert_ne!(transient.is_transient(), transient.is_fatal());
        assert_ne!(fatal.is_transient(), fatal.is_fatal());
    }
}
