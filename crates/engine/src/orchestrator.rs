use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use forumlift_core::{
    Capability, ChannelId, ChannelInfo, MigrationCounts, MigrationRequest, MigrationResult,
    OutgoingPayload, PostRef, SourceMessage, TagId, channel_url,
};
use forumlift_platform::{NewPost, Platform, PlatformError, ProxyHandle, ProxySender};
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{ChannelRole, CreationError, MigrationError, MissingCapability, ValidationError};
use crate::fetcher::HistoryFetcher;
use crate::progress::{NoProgress, ProgressEvent, ProgressSink, RunStage, notify};
use crate::transform::{Transformer, truncate_chars};

/// Tag applied when the destination requires one and none was requested.
pub const FALLBACK_TAG: &str = "migrated";

/// Title used when the source name yields nothing usable.
const DEFAULT_TITLE: &str = "Migrated Channel";

/// Outcome of replaying one message.
enum Replayed {
    Sent { files: u64 },
    Skipped,
    Failed,
}

/// Runs migrations and previews against one platform.
///
/// A migration is strictly sequential: one message at a time, paced by
/// [`EngineConfig::message_delay`], through a single send-identity proxy that
/// is deleted on every exit path once created.
pub struct Migrator<P> {
    platform: P,
    config: EngineConfig,
    progress: Arc<dyn ProgressSink>,
}

impl<P> Migrator<P> {
    /// Create a migrator that reports no progress.
    pub fn new(platform: P, config: EngineConfig) -> Self {
        Self {
            platform,
            config,
            progress: Arc::new(NoProgress),
        }
    }

    /// Send progress notifications to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// The platform this migrator drives.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn progress(&self) -> &dyn ProgressSink {
        self.progress.as_ref()
    }

    pub(crate) async fn stage(&self, source: ChannelId, stage: RunStage) {
        debug!(%source, %stage, "migration stage");
        notify(self.progress(), ProgressEvent::Stage { source, stage }).await;
    }
}

impl<P: Platform + ProxySender> Migrator<P> {
    /// Migrate the source channel of `request` into a new forum post.
    ///
    /// Fatal errors are only returned while no destination post exists.
    /// Once the post is created, per-message failures are counted and
    /// cleanup failures are logged; the call then always returns a result.
    #[instrument(skip_all, fields(source = %request.source, destination = %request.destination))]
    pub async fn migrate(
        &self,
        request: &MigrationRequest,
    ) -> Result<MigrationResult, MigrationError> {
        let started = Instant::now();
        let result = self.run(request, started).await;
        match &result {
            Ok(done) => {
                self.stage(request.source, RunStage::Done).await;
                info!(
                    post = %done.post.id,
                    messages = done.counts.messages,
                    sent = done.counts.sent,
                    skipped = done.counts.skipped,
                    errors = done.counts.errors,
                    attachments = done.counts.attachments,
                    elapsed = ?done.elapsed,
                    "migration complete"
                );
            }
            Err(e) => {
                self.stage(request.source, RunStage::Failed).await;
                warn!(error = %e, "migration failed");
            }
        }
        result
    }

    async fn run(
        &self,
        request: &MigrationRequest,
        started: Instant,
    ) -> Result<MigrationResult, MigrationError> {
        self.stage(request.source, RunStage::Validating).await;
        let (source, destination) = self.validate(request).await?;

        self.stage(request.source, RunStage::Fetching).await;
        let messages = HistoryFetcher::new(&self.platform, &self.config, self.progress())
            .fetch(source.id, request.pins_only)
            .await?;
        if messages.is_empty() {
            return Err(MigrationError::EmptyChannel);
        }

        let tags = resolve_tags(&destination, request.tag.as_deref())?;
        let title = derive_title(
            request.title.as_deref(),
            &source.name,
            self.config.limits.max_title_chars,
        );

        self.stage(request.source, RunStage::CreatingPost).await;
        let header = header_message(
            &source,
            &messages,
            request.pins_only,
            Utc::now(),
            self.config.limits.max_message_chars,
        );
        let post = self.create_post(&destination, &title, header, tags).await?;
        let proxy = match self
            .platform
            .create_proxy(destination.id, &self.config.proxy_name)
            .await
        {
            Ok(proxy) => proxy,
            Err(e) => {
                self.discard_post(post.id).await;
                return Err(CreationError::ProxyFailed(e).into());
            }
        };

        self.stage(request.source, RunStage::Replaying).await;
        let replay = AssertUnwindSafe(self.replay(&proxy, post.id, &messages, source.id))
            .catch_unwind()
            .await;

        self.stage(request.source, RunStage::CleaningUp).await;
        self.delete_proxy(proxy).await;
        let counts = match replay {
            Ok(counts) => counts,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        self.stage(request.source, RunStage::Finalizing).await;
        self.announce_in_source(&source, &post).await;
        if request.archive_source {
            self.archive_source(&source, &post).await;
        }

        Ok(MigrationResult {
            post,
            title,
            counts,
            elapsed: started.elapsed(),
        })
    }

    async fn validate(
        &self,
        request: &MigrationRequest,
    ) -> Result<(ChannelInfo, ChannelInfo), MigrationError> {
        let source = self.platform.channel(request.source).await?;
        let destination = self.platform.channel(request.destination).await?;

        if !source.kind.is_migration_source() {
            return Err(ValidationError::WrongSourceKind(source.kind).into());
        }
        if !destination.kind.is_forum_like() {
            return Err(ValidationError::WrongDestinationKind(destination.kind).into());
        }

        let missing: Vec<MissingCapability> = source
            .missing(Capability::SOURCE)
            .into_iter()
            .map(|capability| MissingCapability {
                channel: ChannelRole::Source,
                capability,
            })
            .chain(
                destination
                    .missing(Capability::DESTINATION)
                    .into_iter()
                    .map(|capability| MissingCapability {
                        channel: ChannelRole::Destination,
                        capability,
                    }),
            )
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingCapabilities(missing).into());
        }

        Ok((source, destination))
    }

    async fn create_post(
        &self,
        destination: &ChannelInfo,
        title: &str,
        header: String,
        tags: Vec<TagId>,
    ) -> Result<PostRef, CreationError> {
        let new_post = NewPost {
            title: title.to_owned(),
            content: header,
            tags,
        };
        let id = self
            .platform
            .create_post(destination.id, &new_post)
            .await
            .map_err(|e| {
                if e.is_forbidden() {
                    CreationError::PostAccessDenied(e)
                } else {
                    CreationError::PostFailed(e)
                }
            })?;

        info!(post = %id, title, "destination post created");
        Ok(PostRef {
            id,
            url: channel_url(destination.guild_id, id),
        })
    }

    async fn replay(
        &self,
        proxy: &ProxyHandle,
        post: ChannelId,
        messages: &[SourceMessage],
        source: ChannelId,
    ) -> MigrationCounts {
        let transformer = Transformer::new(&self.platform, &self.config.limits);
        let total = messages.len() as u64;
        let every = self.config.replay_progress_every.max(1) as u64;
        let mut counts = MigrationCounts::default();

        for message in messages {
            counts.messages += 1;
            match self.replay_one(&transformer, proxy, post, message).await {
                Replayed::Sent { files } => {
                    counts.sent += 1;
                    counts.attachments += files;
                }
                Replayed::Skipped => counts.skipped += 1,
                Replayed::Failed => counts.errors += 1,
            }

            tokio::time::sleep(self.config.message_delay).await;

            if counts.messages % every == 0 {
                notify(
                    self.progress(),
                    ProgressEvent::Replayed {
                        source,
                        processed: counts.messages,
                        total,
                        counts,
                    },
                )
                .await;
            }
        }

        counts
    }

    async fn replay_one(
        &self,
        transformer: &Transformer<'_, P>,
        proxy: &ProxyHandle,
        post: ChannelId,
        message: &SourceMessage,
    ) -> Replayed {
        if message.system || message.is_empty() {
            debug!(message_id = %message.id, system = message.system, "skipping message");
            return Replayed::Skipped;
        }

        let Some(payload) = transformer.transform(message).await else {
            return Replayed::Skipped;
        };

        match self.send_with_retry(proxy, post, &payload).await {
            Ok(()) => Replayed::Sent {
                files: payload.files.len() as u64,
            },
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "failed to send message");
                Replayed::Failed
            }
        }
    }

    /// Send once; on a rate-limit signal wait as asked plus a margin and
    /// send exactly one more time.
    async fn send_with_retry(
        &self,
        proxy: &ProxyHandle,
        post: ChannelId,
        payload: &OutgoingPayload,
    ) -> Result<(), PlatformError> {
        let Err(first) = self.platform.send_as(proxy, post, payload).await else {
            return Ok(());
        };
        let Some(retry_after) = first.retry_after() else {
            return Err(first);
        };

        let wait = retry_after + self.config.rate_limit_margin;
        warn!(?wait, "rate limited, retrying once");
        tokio::time::sleep(wait).await;
        self.platform.send_as(proxy, post, payload).await
    }

    async fn delete_proxy(&self, proxy: ProxyHandle) {
        let id = proxy.id;
        match self.platform.delete_proxy(proxy).await {
            Ok(()) => debug!(proxy = %id, "webhook deleted"),
            Err(e) => warn!(proxy = %id, error = %e, "failed to delete webhook"),
        }
    }

    async fn discard_post(&self, post: ChannelId) {
        if let Err(e) = self.platform.delete_channel(post).await {
            warn!(%post, error = %e, "failed to delete post left without a webhook");
        }
    }

    async fn announce_in_source(&self, source: &ChannelInfo, post: &PostRef) {
        let notice = format!("📦 This channel has been migrated to {}", post.url);
        if let Err(e) = self.platform.send_message(source.id, &notice).await {
            warn!(channel = %source.id, error = %e, "could not post migration notice in source");
        }
    }

    async fn archive_source(&self, source: &ChannelInfo, post: &PostRef) {
        if let Err(e) = self
            .platform
            .lock_channel(source.id, source.guild_id.everyone_role())
            .await
        {
            warn!(channel = %source.id, error = %e, "could not lock source channel");
            return;
        }

        let topic = truncate_chars(
            &format!("📦 Archived: moved to {}", post.url),
            self.config.limits.max_topic_chars,
        );
        if let Err(e) = self.platform.set_topic(source.id, &topic).await {
            warn!(channel = %source.id, error = %e, "could not update source topic");
        }
    }
}

/// Pick the tags for the new post.
///
/// A requested name must match an existing tag, ignoring case. Without a
/// request, a forum that requires tags gets its [`FALLBACK_TAG`] if it has
/// one; otherwise the post is created untagged.
pub fn resolve_tags(
    destination: &ChannelInfo,
    requested: Option<&str>,
) -> Result<Vec<TagId>, ValidationError> {
    if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
        return destination
            .find_tag(name)
            .map(|tag| vec![tag.id])
            .ok_or_else(|| ValidationError::UnknownTag {
                requested: name.to_owned(),
                available: destination
                    .available_tags
                    .iter()
                    .map(|t| t.name.clone())
                    .collect(),
            });
    }

    if destination.requires_tag {
        if let Some(tag) = destination.find_tag(FALLBACK_TAG) {
            return Ok(vec![tag.id]);
        }
    }
    Ok(Vec::new())
}

/// The post title: the override if given, else the channel name with `-`
/// and `_` turned into spaces and every word capitalized. Cut to
/// `max_chars`.
pub fn derive_title(title: Option<&str>, channel_name: &str, max_chars: usize) -> String {
    let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.to_owned(),
        None => channel_name
            .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
    };
    let title = if title.is_empty() {
        DEFAULT_TITLE.to_owned()
    } else {
        title
    };
    title.chars().take(max_chars).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Opening message of the destination post.
pub fn header_message(
    source: &ChannelInfo,
    messages: &[SourceMessage],
    pins_only: bool,
    migrated_at: DateTime<Utc>,
    max_chars: usize,
) -> String {
    let attachments: usize = messages.iter().map(|m| m.attachments.len()).sum();
    let mut lines = vec![
        format!("📦 **Migrated from #{}** (<#{}>)", source.name, source.id),
    ];
    if let Some(topic) = source.topic.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(format!("**Topic:** {topic}"));
    }
    lines.push(format!(
        "**Channel created:** <t:{}:F>",
        source.created_at().timestamp()
    ));
    lines.push(format!("**Migrated:** <t:{}:F>", migrated_at.timestamp()));
    lines.push(format!(
        "**Messages:** {} · **Attachments:** {attachments}",
        messages.len()
    ));
    if pins_only {
        lines.push("*Only pinned messages were migrated.*".to_owned());
    }
    truncate_chars(&lines.join("\n"), max_chars)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use forumlift_core::{Author, ChannelKind, ForumTag, GuildId, MessageId, UserId};

    use super::*;

    fn forum(tags: &[&str], requires_tag: bool) -> ChannelInfo {
        ChannelInfo {
            id: ChannelId::new(500),
            guild_id: GuildId::new(1),
            name: "archive".into(),
            kind: ChannelKind::Forum,
            topic: None,
            parent_id: None,
            available_tags: tags
                .iter()
                .zip(1..)
                .map(|(name, id)| ForumTag {
                    id: TagId::new(id),
                    name: (*name).to_owned(),
                })
                .collect(),
            requires_tag,
            capabilities: Default::default(),
        }
    }

    #[test]
    fn explicit_tag_wins_case_insensitively() {
        let dest = forum(&["Migrated", "Archive"], true);
        assert_eq!(
            resolve_tags(&dest, Some("archive")).unwrap(),
            vec![TagId::new(2)]
        );
    }

    #[test]
    fn unknown_tag_lists_available_names() {
        let dest = forum(&["Migrated", "Archive"], false);
        let err = resolve_tags(&dest, Some("Foo")).unwrap_err();
        match err {
            ValidationError::UnknownTag {
                requested,
                available,
            } => {
                assert_eq!(requested, "Foo");
                assert_eq!(available, vec!["Migrated", "Archive"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_tag_falls_back_to_migrated() {
        let dest = forum(&["Archive", "Migrated"], true);
        assert_eq!(resolve_tags(&dest, None).unwrap(), vec![TagId::new(2)]);

        let dest = forum(&["Archive"], true);
        assert!(resolve_tags(&dest, None).unwrap().is_empty());

        let dest = forum(&["Migrated"], false);
        assert!(resolve_tags(&dest, Some("  ")).unwrap().is_empty());
    }

    #[test]
    fn title_from_channel_name() {
        assert_eq!(derive_title(None, "dev-updates_2024", 100), "Dev Updates 2024");
        assert_eq!(derive_title(None, "general", 100), "General");
        assert_eq!(derive_title(None, "--", 100), DEFAULT_TITLE);
        assert_eq!(derive_title(Some(" Old Chat "), "general", 100), "Old Chat");
        assert_eq!(derive_title(Some(&"t".repeat(150)), "x", 100).len(), 100);
    }

    #[test]
    fn header_summarizes_source() {
        let mut source = forum(&[], false);
        source.kind = ChannelKind::Text;
        source.name = "general".into();
        source.topic = Some("Talk about anything".into());
        let message = SourceMessage {
            id: MessageId::new(1),
            author: Author {
                id: UserId::new(1),
                username: "a".into(),
                global_name: None,
                nickname: None,
                avatar_url: None,
                bot: false,
            },
            content: "hi".into(),
            attachments: vec![],
            embeds: vec![],
            stickers: vec![],
            reply_to: None,
            created_at: Utc::now(),
            system: false,
            pinned: true,
        };
        let migrated_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let header = header_message(&source, &[message], true, migrated_at, 2_000);
        assert!(header.starts_with("📦 **Migrated from #general** (<#500>)"));
        assert!(header.contains("**Topic:** Talk about anything"));
        assert!(header.contains("**Migrated:** <t:1700000000:F>"));
        assert!(header.contains("**Messages:** 1 · **Attachments:** 0"));
        assert!(header.ends_with("*Only pinned messages were migrated.*"));
    }
}
