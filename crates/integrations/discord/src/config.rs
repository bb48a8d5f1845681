use std::time::Duration;

/// Default REST API root.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Configuration for the Discord client.
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token, sent as `Authorization: Bot <token>`.
    pub token: String,

    /// REST API root, without a trailing slash.
    pub api_base: String,

    /// Timeout for every HTTP request, downloads included.
    pub timeout: Duration,

    /// How long a resolved guild nickname is reused.
    pub nickname_ttl: Duration,

    /// Maximum cached nicknames.
    pub nickname_capacity: u64,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("nickname_ttl", &self.nickname_ttl)
            .field("nickname_capacity", &self.nickname_capacity)
            .finish()
    }
}

impl DiscordConfig {
    /// Create a configuration for the given bot token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_owned(),
            timeout: Duration::from_secs(30),
            nickname_ttl: Duration::from_secs(600),
            nickname_capacity: 10_000,
        }
    }

    /// Point the client at another API root.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_owned();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how long resolved nicknames are cached.
    #[must_use]
    pub fn with_nickname_ttl(mut self, ttl: Duration) -> Self {
        self.nickname_ttl = ttl;
        self
    }
}
