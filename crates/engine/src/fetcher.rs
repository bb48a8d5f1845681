use std::pin::pin;
use std::time::Duration;

use forumlift_core::{ChannelId, MessageId, SourceMessage};
use forumlift_platform::{Platform, PlatformError};
use futures::{Stream, TryStreamExt, stream};
use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::progress::{ProgressEvent, ProgressSink, notify};

enum PageCursor {
    Start,
    Before(MessageId),
}

/// Stream the history of `channel` one page at a time, newest page first.
///
/// Each page is newest-first as the platform returns it. The stream pauses
/// for `batch_delay` before every page after the first and ends at the first
/// empty page. Calling this again starts over from the newest message.
pub fn history_pages<P: Platform>(
    platform: &P,
    channel: ChannelId,
    page_size: u8,
    batch_delay: Duration,
) -> impl Stream<Item = Result<Vec<SourceMessage>, PlatformError>> + Send + '_ {
    stream::try_unfold(PageCursor::Start, move |cursor| async move {
        let before = match cursor {
            PageCursor::Start => None,
            PageCursor::Before(id) => {
                tokio::time::sleep(batch_delay).await;
                Some(id)
            }
        };

        let page = platform.messages_before(channel, before, page_size).await?;
        let Some(oldest) = page.last().map(|m| m.id) else {
            return Ok(None);
        };
        Ok::<_, PlatformError>(Some((page, PageCursor::Before(oldest))))
    })
}

/// Reads a channel's history into a chronological list.
pub struct HistoryFetcher<'a, P> {
    platform: &'a P,
    config: &'a EngineConfig,
    progress: &'a dyn ProgressSink,
}

impl<'a, P: Platform> HistoryFetcher<'a, P> {
    /// Create a fetcher.
    pub fn new(platform: &'a P, config: &'a EngineConfig, progress: &'a dyn ProgressSink) -> Self {
        Self {
            platform,
            config,
            progress,
        }
    }

    /// The full history or only the pinned messages, oldest first.
    pub async fn fetch(
        &self,
        channel: ChannelId,
        pins_only: bool,
    ) -> Result<Vec<SourceMessage>, PlatformError> {
        if pins_only {
            self.fetch_pinned(channel).await
        } else {
            self.fetch_all(channel).await
        }
    }

    /// Every message in the channel, oldest first.
    ///
    /// Errors from any page are returned as-is; nothing is retried here.
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn fetch_all(&self, channel: ChannelId) -> Result<Vec<SourceMessage>, PlatformError> {
        let mut pages = pin!(history_pages(
            self.platform,
            channel,
            self.config.page_size,
            self.config.batch_delay,
        ));

        let mut messages = Vec::new();
        let mut batches = 0usize;
        while let Some(page) = pages.try_next().await? {
            batches += 1;
            messages.extend(page);

            if batches % self.config.fetch_progress_every.max(1) == 0 {
                notify(
                    self.progress,
                    ProgressEvent::Fetched {
                        channel,
                        batches,
                        messages: messages.len(),
                    },
                )
                .await;
            }
        }

        messages.reverse();
        debug!(batches, count = messages.len(), "history fetched");
        Ok(messages)
    }

    /// The pinned messages of the channel, oldest first.
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn fetch_pinned(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<SourceMessage>, PlatformError> {
        let mut pins = self.platform.pinned_messages(channel).await?;
        pins.reverse();
        debug!(count = pins.len(), "pinned messages fetched");
        Ok(pins)
    }
}
