//! `AIError`: the closed error taxonomy every backend maps its wire errors
//! into. Grounded in the teacher's `ProviderError`/`APICallError` builder
//! pattern (`ai-sdk-provider/src/error/api_call.rs`), adapted to a single flat
//! enum since Conduit's taxonomy is fixed by the specification rather than
//! left open per-provider.

use thiserror::Error;

/// The closed set of error kinds a Conduit backend can surface. Every wire or
/// runtime failure maps to exactly one of these.
#[derive(Debug, Error)]
pub enum AIError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("billing error: {0}")]
    Billing(String),

    #[error("rate limited{}", retry_after.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after: Option<f64> },

    #[error("server error ({status_code}): {message}")]
    ServerError { status_code: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("model not cached: {0}")]
    ModelNotCached(String),

    #[error("token limit exceeded: {count} > {limit}")]
    TokenLimitExceeded { count: u32, limit: u32 },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("insufficient memory: need {required}, have {available}")]
    InsufficientMemory { required: u64, available: u64 },

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("cancelled")]
    Cancelled,
}

impl AIError {
    /// Whether the HTTP executor (§4.4) should retry this error. Only
    /// transport failures, 429s and 5xx/timeouts are retryable; everything
    /// else is a terminal failure the caller must handle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::RateLimited { .. }
                | AIError::ServerError { .. }
                | AIError::Timeout(_)
                | AIError::NetworkError(_)
        )
    }

    /// Maps an HTTP status code plus an optional `Retry-After` header value
    /// (seconds) to an `AIError`, per the §4.3 taxonomy table. `message` is
    /// the provider's own decoded error text.
    pub fn from_status(status_code: u16, message: impl Into<String>, retry_after: Option<f64>) -> Self {
        let message = message.into();
        match status_code {
            400 | 404 | 413 => AIError::InvalidInput(message),
            401 | 403 => AIError::AuthenticationFailed(message),
            402 => AIError::Billing(message),
            429 => AIError::RateLimited { retry_after },
            504 => AIError::Timeout(std::time::Duration::from_secs(retry_after.unwrap_or(0.0) as u64)),
            500..=599 => AIError::ServerError { status_code, message },
            _ => AIError::GenerationFailed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy_table() {
        assert!(matches!(AIError::from_status(400, "bad", None), AIError::InvalidInput(_)));
        assert!(matches!(AIError::from_status(401, "no", None), AIError::AuthenticationFailed(_)));
        assert!(matches!(AIError::from_status(402, "pay", None), AIError::Billing(_)));
        assert!(matches!(
            AIError::from_status(429, "slow down", Some(1.0)),
            AIError::RateLimited { retry_after: Some(r) } if r == 1.0
        ));
        assert!(matches!(AIError::from_status(503, "down", None), AIError::ServerError { status_code: 503, .. }));
    }

    #[test]
    fn only_transient_kinds_are_retryable() {
        assert!(AIError::RateLimited { retry_after: None }.is_retryable());
        assert!(AIError::ServerError { status_code: 500, message: String::new() }.is_retryable());
        assert!(AIError::Timeout(std::time::Duration::from_secs(1)).is_retryable());
        assert!(AIError::NetworkError("reset".to_string()).is_retryable());
        assert!(!AIError::InvalidInput(String::new()).is_retryable());
        assert!(!AIError::Cancelled.is_retryable());
    }
}
