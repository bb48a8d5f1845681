use std::time::Duration;

use thiserror::Error;

/// Errors returned by a platform binding.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The channel, message, or proxy does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The platform refused the operation for lack of access.
    #[error("access denied: {0}")]
    Forbidden(String),

    /// The platform asked the caller to slow down.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// How long the platform asked the caller to wait.
        retry_after: Duration,
    },

    /// The platform returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or description.
        message: String,
    },

    /// A network or transport-level error occurred.
    #[error("connection error: {0}")]
    Connection(String),

    /// The platform did not respond within the allowed duration.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// A request or response body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The binding was given invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl PlatformError {
    /// Returns `true` for a rate-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// The wait the platform requested, for rate-limit signals.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited { .. }
        )
    }

    /// Returns `true` when the platform refused access.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}
