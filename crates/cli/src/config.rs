use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use forumlift_discord::DiscordConfig;
use forumlift_engine::{EngineConfig, EngineSection};
use serde::Deserialize;
use tracing::debug;

/// Contents of a `forumlift.toml` file. Every table and field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineSection,
    /// Discord client settings.
    #[serde(default)]
    pub discord: DiscordSection,
}

/// The `[discord]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordSection {
    /// REST API root.
    pub api_base: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        debug!(path = %path.display(), "loading config file");
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Engine configuration, with command-line and environment overrides
    /// applied on top of the file.
    pub fn engine(&self, delay_ms: Option<u64>, cooldown_ms: Option<u64>) -> EngineConfig {
        let mut config = EngineConfig::from_section(&self.engine);
        if let Some(ms) = delay_ms {
            config = config.with_message_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = cooldown_ms {
            config = config.with_channel_cooldown(Duration::from_millis(ms));
        }
        config
    }

    /// Discord client configuration for `token`.
    pub fn discord(&self, token: String) -> DiscordConfig {
        let mut config = DiscordConfig::new(token);
        if let Some(base) = &self.discord.api_base {
            config = config.with_api_base(base);
        }
        if let Some(secs) = self.discord.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

/// A bulk plan: `[[migration]]` entries run in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkPlan {
    /// Requests to run.
    #[serde(rename = "migration", default)]
    pub migrations: Vec<forumlift_core::MigrationRequest>,
}

impl BulkPlan {
    /// Load a plan file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid bulk plan {}", path.display()))
    }
}
