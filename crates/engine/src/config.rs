use std::time::Duration;

use forumlift_core::PlatformLimits;
use serde::Deserialize;

/// Tuning values for a migration run.
///
/// The engine never reads the environment; callers resolve these values and
/// pass them in.
///
/// # Examples
///
/// ```
/// use forumlift_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.message_delay.as_millis(), 1500);
/// assert_eq!(config.page_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause after every replayed message.
    pub message_delay: Duration,
    /// Pause between history pages.
    pub batch_delay: Duration,
    /// Messages requested per history page.
    pub page_size: u8,
    /// Report fetch progress every this many pages.
    pub fetch_progress_every: usize,
    /// Report replay progress every this many messages.
    pub replay_progress_every: usize,
    /// Added on top of the wait a rate-limit signal asks for.
    pub rate_limit_margin: Duration,
    /// Pause between runs in bulk mode.
    pub channel_cooldown: Duration,
    /// Name given to the send-identity proxy.
    pub proxy_name: String,
    /// Platform limits.
    pub limits: PlatformLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            message_delay: Duration::from_millis(1_500),
            batch_delay: Duration::from_millis(500),
            page_size: 100,
            fetch_progress_every: 5,
            replay_progress_every: 15,
            rate_limit_margin: Duration::from_millis(500),
            channel_cooldown: Duration::from_secs(30),
            proxy_name: "forumlift".into(),
            limits: PlatformLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from a file section, keeping defaults for every
    /// field the section leaves out.
    pub fn from_section(section: &EngineSection) -> Self {
        let defaults = Self::default();
        Self {
            message_delay: section
                .message_delay_ms
                .map_or(defaults.message_delay, Duration::from_millis),
            batch_delay: section
                .batch_delay_ms
                .map_or(defaults.batch_delay, Duration::from_millis),
            page_size: section.page_size.map_or(defaults.page_size, |p| p.clamp(1, 100)),
            fetch_progress_every: section
                .fetch_progress_every
                .map_or(defaults.fetch_progress_every, |n| n.max(1)),
            replay_progress_every: section
                .replay_progress_every
                .map_or(defaults.replay_progress_every, |n| n.max(1)),
            rate_limit_margin: section
                .rate_limit_margin_ms
                .map_or(defaults.rate_limit_margin, Duration::from_millis),
            channel_cooldown: section
                .channel_cooldown_ms
                .map_or(defaults.channel_cooldown, Duration::from_millis),
            proxy_name: section.proxy_name.clone().unwrap_or(defaults.proxy_name),
            limits: section.limits.unwrap_or(defaults.limits),
        }
    }

    /// Override the per-message delay.
    #[must_use]
    pub fn with_message_delay(mut self, delay: Duration) -> Self {
        self.message_delay = delay;
        self
    }

    /// Override the bulk cooldown.
    #[must_use]
    pub fn with_channel_cooldown(mut self, cooldown: Duration) -> Self {
        self.channel_cooldown = cooldown;
        self
    }
}

/// The `[engine]` table of a configuration file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSection {
    /// Pause after every replayed message, in milliseconds.
    pub message_delay_ms: Option<u64>,
    /// Pause between history pages, in milliseconds.
    pub batch_delay_ms: Option<u64>,
    /// Messages requested per history page (1..=100).
    pub page_size: Option<u8>,
    /// Report fetch progress every this many pages.
    pub fetch_progress_every: Option<usize>,
    /// Report replay progress every this many messages.
    pub replay_progress_every: Option<usize>,
    /// Extra wait on top of a rate-limit signal, in milliseconds.
    pub rate_limit_margin_ms: Option<u64>,
    /// Pause between bulk runs, in milliseconds.
    pub channel_cooldown_ms: Option<u64>,
    /// Name given to the send-identity proxy.
    pub proxy_name: Option<String>,
    /// Platform limit overrides.
    pub limits: Option<PlatformLimits>,
}
