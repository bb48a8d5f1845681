//! End-to-end migration runs against the in-memory platform.

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use forumlift_core::{
    Attachment, Author, Capability, ChannelId, ChannelInfo, ChannelKind, Embed, EmbedKind,
    ForumTag, GuildId, MessageId, MigrationCounts, MigrationRequest, RoleId, SourceMessage, TagId,
    UserId,
};
use forumlift_engine::{
    ChannelRole, CreationError, EngineConfig, MigrationError, Migrator, ProgressError,
    ProgressEvent, ProgressSink, RunStage, ValidationError,
};
use forumlift_platform::{MemoryPlatform, PlatformError, SendOutcome};
use futures::FutureExt;

const GUILD: GuildId = GuildId::new(1_000);
const SOURCE: ChannelId = ChannelId::new(10);
const FORUM: ChannelId = ChannelId::new(20);

#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressEvent>>);

impl Recorder {
    fn stages(&self) -> Vec<RunStage> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Stage { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    fn replayed(&self) -> Vec<(u64, u64, MigrationCounts)> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Replayed {
                    processed,
                    total,
                    counts,
                    ..
                } => Some((*processed, *total, *counts)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ProgressSink for Recorder {
    async fn report(&self, event: &ProgressEvent) -> Result<(), ProgressError> {
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn source_channel() -> ChannelInfo {
    ChannelInfo {
        id: SOURCE,
        guild_id: GUILD,
        name: "dev-updates".into(),
        kind: ChannelKind::Text,
        topic: Some("Release notes".into()),
        parent_id: None,
        available_tags: vec![],
        requires_tag: false,
        capabilities: Capability::SOURCE.iter().copied().collect(),
    }
}

fn forum_channel(tags: &[&str]) -> ChannelInfo {
    ChannelInfo {
        id: FORUM,
        guild_id: GUILD,
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
        requires_tag: false,
        capabilities: Capability::DESTINATION.iter().copied().collect(),
    }
}

fn message(id: u64, content: &str) -> SourceMessage {
    SourceMessage {
        id: MessageId::new(id),
        author: Author {
            id: UserId::new(id % 2 + 1),
            username: format!("user{}", id % 2 + 1),
            global_name: None,
            nickname: None,
            avatar_url: None,
            bot: false,
        },
        content: content.into(),
        attachments: vec![],
        embeds: vec![],
        stickers: vec![],
        reply_to: None,
        created_at: Utc
            .timestamp_opt(1_700_000_000 + i64::try_from(id).unwrap() * 60, 0)
            .unwrap(),
        system: false,
        pinned: false,
    }
}

fn system_message(id: u64) -> SourceMessage {
    SourceMessage {
        system: true,
        content: String::new(),
        ..message(id, "")
    }
}

fn platform(messages: Vec<SourceMessage>) -> MemoryPlatform {
    MemoryPlatform::new()
        .with_channel(source_channel())
        .with_channel(forum_channel(&["Migrated", "Archive"]))
        .with_messages(SOURCE, messages)
}

fn three_with_one_system() -> Vec<SourceMessage> {
    vec![message(1, "first"), system_message(2), message(3, "third")]
}

fn request() -> MigrationRequest {
    MigrationRequest::new(SOURCE, FORUM)
}

#[tokio::test(start_paused = true)]
async fn system_messages_are_skipped() {
    let migrator = Migrator::new(platform(three_with_one_system()), EngineConfig::default());

    let result = migrator.migrate(&request()).await.unwrap();
    assert_eq!(result.counts.messages, 3);
    assert_eq!(result.counts.skipped, 1);
    assert_eq!(result.counts.sent, 2);
    assert_eq!(result.counts.errors, 0);
    assert_eq!(result.counts.attachments, 0);
    assert_eq!(result.title, "Dev Updates");

    let calls = migrator.platform().calls();
    assert_eq!(calls.posts.len(), 1);
    let (forum, post_id, post) = &calls.posts[0];
    assert_eq!(*forum, FORUM);
    assert_eq!(result.post.id, *post_id);
    assert_eq!(
        result.post.url,
        format!("https://discord.com/channels/{GUILD}/{post_id}")
    );
    assert!(post.content.contains("**Messages:** 3"));
    assert!(post.tags.is_empty());

    let sent: Vec<&str> = calls
        .sent
        .iter()
        .map(|s| s.payload.content.as_str())
        .collect();
    assert!(sent[0].starts_with("first\n-# <t:"));
    assert!(sent[1].starts_with("third\n-# <t:"));
    assert!(calls.sent.iter().all(|s| s.thread == *post_id));

    assert_eq!(calls.proxies_created.len(), 1);
    assert_eq!(calls.proxies_created[0].0, FORUM);
    assert_eq!(calls.proxies_deleted, vec![calls.proxies_created[0].1.id]);

    assert_eq!(calls.plain_messages.len(), 1);
    assert_eq!(calls.plain_messages[0].0, SOURCE);
    assert!(calls.plain_messages[0].1.contains(&result.post.url));
    assert!(calls.locks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_tag_fails_before_creating_anything() {
    let migrator = Migrator::new(platform(three_with_one_system()), EngineConfig::default());

    let err = migrator
        .migrate(&request().with_tag("Foo"))
        .await
        .unwrap_err();
    match &err {
        MigrationError::Validation(ValidationError::UnknownTag {
            requested,
            available,
        }) => {
            assert_eq!(requested, "Foo");
            assert_eq!(available, &["Migrated", "Archive"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Migrated, Archive"));

    let calls = migrator.platform().calls();
    assert!(calls.posts.is_empty());
    assert!(calls.proxies_created.is_empty());
}

#[tokio::test(start_paused = true)]
async fn requested_tag_is_applied() {
    let migrator = Migrator::new(platform(three_with_one_system()), EngineConfig::default());

    migrator
        .migrate(&request().with_tag("archive").with_title("Old dev chat"))
        .await
        .unwrap();
    let calls = migrator.platform().calls();
    assert_eq!(calls.posts[0].2.tags, vec![TagId::new(2)]);
    assert_eq!(calls.posts[0].2.title, "Old dev chat");
}

#[tokio::test(start_paused = true)]
async fn rate_limit_is_retried_once_after_waiting() {
    let platform = platform(vec![message(1, "only")]);
    platform.script_send(SendOutcome::Fail(PlatformError::RateLimited {
        retry_after: Duration::from_secs(5),
    }));
    let migrator = Migrator::new(platform, EngineConfig::default());

    let result = migrator.migrate(&request()).await.unwrap();
    assert_eq!(result.counts.sent, 1);
    assert_eq!(result.counts.errors, 0);

    let attempts = migrator.platform().calls().send_attempts;
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] - attempts[0] >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn second_rate_limit_counts_as_error() {
    let platform = platform(vec![message(1, "a"), message(2, "b")]);
    for _ in 0..2 {
        platform.script_send(SendOutcome::Fail(PlatformError::RateLimited {
            retry_after: Duration::from_secs(1),
        }));
    }
    let migrator = Migrator::new(platform, EngineConfig::default());

    let result = migrator.migrate(&request()).await.unwrap();
    assert_eq!(result.counts.errors, 1);
    assert_eq!(result.counts.sent, 1);
    assert_eq!(migrator.platform().calls().send_attempts.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn send_errors_are_counted_and_run_continues() {
    let platform = platform(vec![message(1, "a"), message(2, "b"), message(3, "c")]);
    platform.script_send(SendOutcome::Deliver);
    platform.script_send(SendOutcome::Fail(PlatformError::Api {
        status: 400,
        message: "Invalid Form Body".into(),
    }));
    let migrator = Migrator::new(platform, EngineConfig::default());

    let result = migrator.migrate(&request()).await.unwrap();
    let counts = result.counts;
    assert_eq!(counts.errors, 1);
    assert_eq!(counts.sent, 2);
    assert_eq!(counts.sent + counts.skipped + counts.errors, counts.messages);
    assert_eq!(migrator.platform().calls().proxies_deleted.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn proxy_is_deleted_when_replay_panics() {
    let platform = platform(vec![message(1, "a"), message(2, "b")]);
    platform.script_send(SendOutcome::Deliver);
    platform.script_send(SendOutcome::Panic);
    let migrator = Migrator::new(platform, EngineConfig::default());

    let outcome = AssertUnwindSafe(migrator.migrate(&request()))
        .catch_unwind()
        .await;
    assert!(outcome.is_err());

    let calls = migrator.platform().calls();
    assert_eq!(calls.proxies_created.len(), 1);
    assert_eq!(calls.proxies_deleted, vec![calls.proxies_created[0].1.id]);
    assert!(calls.plain_messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_proxy_deletion_does_not_fail_the_run() {
    let platform = platform(vec![message(1, "a")]);
    platform.fail_delete_proxy(PlatformError::NotFound("Unknown Webhook".into()));
    let migrator = Migrator::new(platform, EngineConfig::default());

    let result = migrator.migrate(&request()).await.unwrap();
    assert_eq!(result.counts.sent, 1);
    assert_eq!(migrator.platform().calls().proxies_deleted.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn messages_are_paced() {
    let migrator = Migrator::new(
        platform(three_with_one_system()),
        EngineConfig::default().with_message_delay(Duration::from_secs(2)),
    );

    let result = migrator.migrate(&request()).await.unwrap();
    // One pause after every message, skipped ones included.
    assert!(result.elapsed >= Duration::from_secs(6));
    let attempts = migrator.platform().calls().send_attempts;
    assert_eq!(attempts[1] - attempts[0], Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn missing_capabilities_are_all_reported() {
    let mut source = source_channel();
    source.capabilities = BTreeSet::from([Capability::View]);
    let mut forum = forum_channel(&[]);
    forum.capabilities.remove(&Capability::ManageSendProxy);
    forum.capabilities.remove(&Capability::CreatePost);
    let platform = MemoryPlatform::new()
        .with_channel(source)
        .with_channel(forum)
        .with_messages(SOURCE, vec![message(1, "a")]);
    let migrator = Migrator::new(platform, EngineConfig::default());

    let err = migrator.migrate(&request()).await.unwrap_err();
    let MigrationError::Validation(ValidationError::MissingCapabilities(missing)) = err else {
        panic!("unexpected error: {err}");
    };
    let pairs: Vec<(ChannelRole, Capability)> =
        missing.iter().map(|m| (m.channel, m.capability)).collect();
    assert_eq!(
        pairs,
        vec![
            (ChannelRole::Source, Capability::ReadHistory),
            (ChannelRole::Destination, Capability::ManageSendProxy),
            (ChannelRole::Destination, Capability::CreatePost),
        ]
    );
    assert!(migrator.platform().calls().pages.is_empty());
}

#[tokio::test]
async fn wrong_channel_kinds_are_rejected() {
    let mut voice = source_channel();
    voice.kind = ChannelKind::Voice;
    let migrator = Migrator::new(
        MemoryPlatform::new()
            .with_channel(voice)
            .with_channel(forum_channel(&[])),
        EngineConfig::default(),
    );
    let err = migrator.migrate(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Validation(ValidationError::WrongSourceKind(ChannelKind::Voice))
    ));

    let mut text_dest = forum_channel(&[]);
    text_dest.kind = ChannelKind::Text;
    let migrator = Migrator::new(
        MemoryPlatform::new()
            .with_channel(source_channel())
            .with_channel(text_dest),
        EngineConfig::default(),
    );
    let err = migrator.migrate(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Validation(ValidationError::WrongDestinationKind(ChannelKind::Text))
    ));
}

#[tokio::test]
async fn empty_channel_creates_nothing() {
    let migrator = Migrator::new(platform(vec![]), EngineConfig::default());

    let err = migrator.migrate(&request()).await.unwrap_err();
    assert!(matches!(err, MigrationError::EmptyChannel));
    assert!(migrator.platform().calls().posts.is_empty());
}

#[tokio::test]
async fn history_failure_is_fatal_before_any_post() {
    let platform = platform(three_with_one_system());
    platform.fail_history(PlatformError::Forbidden("Missing Access".into()));
    let migrator = Migrator::new(platform, EngineConfig::default());

    let err = migrator.migrate(&request()).await.unwrap_err();
    assert!(matches!(err, MigrationError::Fetch(PlatformError::Forbidden(_))));
    assert!(migrator.platform().calls().posts.is_empty());
}

#[tokio::test]
async fn post_access_denied_is_distinguished() {
    let platform = platform(three_with_one_system());
    platform.fail_create_post(PlatformError::Forbidden("Missing Permissions".into()));
    let migrator = Migrator::new(platform, EngineConfig::default());

    let err = migrator.migrate(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Creation(CreationError::PostAccessDenied(_))
    ));
    assert!(migrator.platform().calls().proxies_created.is_empty());
}

#[tokio::test]
async fn post_is_removed_when_proxy_cannot_be_created() {
    let platform = platform(three_with_one_system());
    platform.fail_create_proxy(PlatformError::Api {
        status: 400,
        message: "Maximum number of webhooks reached".into(),
    });
    let migrator = Migrator::new(platform, EngineConfig::default());

    let err = migrator.migrate(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Creation(CreationError::ProxyFailed(_))
    ));
    let calls = migrator.platform().calls();
    assert_eq!(calls.deleted_channels, vec![calls.posts[0].1]);
    assert!(calls.sent.is_empty());
}

#[tokio::test(start_paused = true)]
async fn archive_locks_and_retitles_source() {
    let migrator = Migrator::new(platform(three_with_one_system()), EngineConfig::default());

    let result = migrator
        .migrate(&request().with_archive_source(true))
        .await
        .unwrap();
    let calls = migrator.platform().calls();
    assert_eq!(calls.locks, vec![(SOURCE, RoleId::new(GUILD.get()))]);
    assert_eq!(calls.topics.len(), 1);
    assert!(calls.topics[0].1.contains(&result.post.url));
}

#[tokio::test(start_paused = true)]
async fn finalization_failures_are_swallowed() {
    let platform = platform(three_with_one_system());
    platform.fail_send_message(PlatformError::Forbidden("Missing Permissions".into()));
    platform.fail_lock(PlatformError::Forbidden("Missing Permissions".into()));
    let migrator = Migrator::new(platform, EngineConfig::default());

    let result = migrator
        .migrate(&request().with_archive_source(true))
        .await
        .unwrap();
    assert_eq!(result.counts.sent, 2);
    assert!(migrator.platform().calls().topics.is_empty());
}

#[tokio::test(start_paused = true)]
async fn pins_only_replays_pinned_messages() {
    let mut pinned = message(2, "pinned");
    pinned.pinned = true;
    let migrator = Migrator::new(
        platform(vec![message(1, "a"), pinned, message(3, "c")]),
        EngineConfig::default(),
    );

    let result = migrator
        .migrate(&request().with_pins_only(true))
        .await
        .unwrap();
    assert_eq!(result.counts.messages, 1);
    let calls = migrator.platform().calls();
    assert!(calls.pages.is_empty());
    assert!(calls.posts[0].2.content.contains("Only pinned messages"));
    assert!(calls.sent[0].payload.content.starts_with("pinned"));
}

#[tokio::test(start_paused = true)]
async fn oversized_attachment_becomes_note() {
    let mut big = message(1, "see attached");
    big.attachments = vec![Attachment {
        filename: "dump.bin".into(),
        size: 30 * 1024 * 1024,
        content_type: None,
        url: "https://cdn.example/dump.bin".into(),
        description: None,
    }];
    let migrator = Migrator::new(platform(vec![big]), EngineConfig::default());

    let result = migrator.migrate(&request()).await.unwrap();
    assert_eq!(result.counts.sent, 1);
    assert_eq!(result.counts.attachments, 0);
    let calls = migrator.platform().calls();
    assert!(calls.downloads.is_empty());
    assert!(calls.sent[0].payload.content.contains("Skipped large file"));
}

#[tokio::test(start_paused = true)]
async fn stages_are_reported_in_order() {
    let recorder = Arc::new(Recorder::default());
    let migrator = Migrator::new(platform(three_with_one_system()), EngineConfig::default())
        .with_progress(recorder.clone());

    migrator.migrate(&request()).await.unwrap();
    assert_eq!(
        recorder.stages(),
        vec![
            RunStage::Validating,
            RunStage::Fetching,
            RunStage::CreatingPost,
            RunStage::Replaying,
            RunStage::CleaningUp,
            RunStage::Finalizing,
            RunStage::Done,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn replay_progress_every_fifteen_messages() {
    let messages = (1..=31)
        .map(|id| {
            if id == 7 {
                system_message(id)
            } else {
                message(id, "text")
            }
        })
        .collect();
    let recorder = Arc::new(Recorder::default());
    let migrator =
        Migrator::new(platform(messages), EngineConfig::default()).with_progress(recorder.clone());

    let result = migrator.migrate(&request()).await.unwrap();
    assert_eq!(result.counts.messages, 31);

    let replayed = recorder.replayed();
    let processed: Vec<u64> = replayed.iter().map(|(p, _, _)| *p).collect();
    assert_eq!(processed, vec![15, 30]);
    for (processed, total, counts) in replayed {
        assert_eq!(total, 31);
        assert_eq!(counts.messages, processed);
        assert_eq!(counts.sent + counts.skipped + counts.errors, counts.messages);
        assert_eq!(counts.skipped, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn blank_reply_with_link_preview_is_sent() {
    let mut reply = message(1, "  ");
    reply.reply_to = Some(MessageId::new(0));
    reply.embeds = vec![Embed {
        kind: EmbedKind::Link,
        url: Some("https://example.com".into()),
        ..Embed::default()
    }];
    let migrator = Migrator::new(platform(vec![reply, message(2, "b")]), EngineConfig::default());

    let result = migrator.migrate(&request()).await.unwrap();
    assert_eq!(result.counts.sent, 2);
    assert_eq!(result.counts.skipped, 0);
    let sent = migrator.platform().calls().sent;
    assert!(sent[0].payload.content.starts_with("-# ↪ *Reply to an earlier message*\n-# <t:"));
}

#[tokio::test(start_paused = true)]
async fn bulk_runs_continue_past_failures_with_cooldown() {
    const OTHER: ChannelId = ChannelId::new(11);
    let mut other = source_channel();
    other.id = OTHER;
    let platform = platform(three_with_one_system())
        .with_channel(other)
        .with_messages(OTHER, vec![]);
    let recorder = Arc::new(Recorder::default());
    let config = EngineConfig::default().with_channel_cooldown(Duration::from_secs(30));
    let migrator = Migrator::new(platform, config).with_progress(recorder.clone());

    let started = tokio::time::Instant::now();
    let outcomes = migrator
        .migrate_all(&[MigrationRequest::new(OTHER, FORUM), request()])
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        outcomes[0].result,
        Err(MigrationError::EmptyChannel)
    ));
    assert_eq!(outcomes[1].result.as_ref().unwrap().counts.sent, 2);
    assert!(started.elapsed() >= Duration::from_secs(30));

    let cooldowns = recorder
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Cooldown { .. }))
        .count();
    assert_eq!(cooldowns, 1);
}
