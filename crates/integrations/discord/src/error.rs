use std::time::Duration;

use forumlift_platform::PlatformError;
use thiserror::Error;

use crate::types::ApiErrorBody;

/// Fallback wait when a 429 carries no usable `retry_after`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Errors specific to the Discord client.
///
/// These are internal errors that get converted into [`PlatformError`] at the
/// public API boundary.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The Discord API returned an error response.
    #[error("Discord API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Discord's JSON error code, when present.
        code: Option<u64>,
        /// Discord's error message or the raw body.
        message: String,
    },

    /// The client received an HTTP 429 (Too Many Requests) response.
    #[error("rate limited by Discord, retry after {retry_after:?}")]
    RateLimited {
        /// How long Discord asked the client to wait.
        retry_after: Duration,
    },

    /// A response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The HTTP client could not be built.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl DiscordError {
    /// Classify a non-success response.
    ///
    /// `retry_header` is the `Retry-After` header in seconds; the JSON body's
    /// `retry_after` takes precedence when both are present.
    pub fn from_status(status: u16, body: &str, retry_header: Option<f64>) -> Self {
        let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();

        if status == 429 {
            let seconds = parsed
                .as_ref()
                .and_then(|b| b.retry_after)
                .or(retry_header)
                .filter(|s| s.is_finite() && *s >= 0.0);
            let retry_after = seconds.map_or(DEFAULT_RETRY_AFTER, Duration::from_secs_f64);
            return Self::RateLimited { retry_after };
        }

        let (code, message) = match parsed {
            Some(ApiErrorBody { code, message, .. }) => {
                (code, message.unwrap_or_else(|| body.to_owned()))
            }
            None => (None, body.to_owned()),
        };
        Self::Api {
            status,
            code,
            message,
        }
    }
}

impl From<DiscordError> for PlatformError {
    fn from(err: DiscordError) -> Self {
        match err {
            DiscordError::Http(e) => PlatformError::Connection(e.to_string()),
            DiscordError::Timeout(after) => PlatformError::Timeout(after),
            DiscordError::Api {
                status: 403,
                message,
                ..
            } => PlatformError::Forbidden(message),
            DiscordError::Api {
                status: 404,
                message,
                ..
            } => PlatformError::NotFound(message),
            DiscordError::Api {
                status, message, ..
            } => PlatformError::Api { status, message },
            DiscordError::RateLimited { retry_after } => PlatformError::RateLimited { retry_after },
            DiscordError::InvalidResponse(msg) => PlatformError::Serialization(msg),
            DiscordError::Config(msg) => PlatformError::Configuration(msg),
        }
    }
}
