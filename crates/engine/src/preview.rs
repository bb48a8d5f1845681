use std::collections::HashSet;

use forumlift_core::{ChannelId, ChannelInfo, PreviewStats, SourceMessage};
use forumlift_platform::{Platform, PlatformError};
use tracing::{info, instrument};

use crate::fetcher::HistoryFetcher;
use crate::orchestrator::Migrator;

impl<P: Platform> Migrator<P> {
    /// Statistics about `channel` without changing anything.
    ///
    /// Reads the full history plus the pinned list, so it costs as many
    /// requests as the fetch phase of a real migration.
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn preview(&self, channel: ChannelId) -> Result<PreviewStats, PlatformError> {
        let info = self.platform().channel(channel).await?;
        let fetcher = HistoryFetcher::new(self.platform(), self.config(), self.progress());
        let messages = fetcher.fetch_all(channel).await?;
        let pinned = self.platform().pinned_messages(channel).await?;

        let stats = summarize(&info, &messages, pinned.len() as u64);
        info!(
            total = stats.total_messages,
            pinned = stats.pinned_messages,
            authors = stats.unique_authors,
            "preview ready"
        );
        Ok(stats)
    }
}

/// Statistics over a chronological message list.
pub fn summarize(channel: &ChannelInfo, messages: &[SourceMessage], pinned: u64) -> PreviewStats {
    let mut stats = PreviewStats::empty(channel);
    let mut authors = HashSet::new();

    for message in messages {
        stats.total_messages += 1;
        authors.insert(message.author.id);

        if message.author.bot {
            stats.bot_messages += 1;
        }
        if message.system {
            stats.system_messages += 1;
        }
        if message.attachments.is_empty() {
            if !message.content.trim().is_empty() {
                stats.text_only += 1;
            }
        } else {
            if message.attachments.iter().any(|a| a.is_image()) {
                stats.with_images += 1;
            }
            if message.attachments.iter().any(|a| !a.is_image()) {
                stats.with_files += 1;
            }
        }
        stats.attachment_bytes += message.attachment_bytes();
    }

    stats.pinned_messages = pinned;
    stats.unique_authors = authors.len() as u64;
    stats.first_message_at = messages.first().map(|m| m.created_at);
    stats.last_message_at = messages.last().map(|m| m.created_at);
    stats
}
