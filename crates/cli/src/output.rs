use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use forumlift_core::{MigrationResult, PreviewStats};

/// Human-readable summary of a finished migration.
pub fn migration_text(result: &MigrationResult) -> String {
    let c = &result.counts;
    let mut out = String::new();
    let _ = writeln!(out, "Migrated to {}", result.post.url);
    let _ = writeln!(out, "  title:       {}", result.title);
    let _ = writeln!(out, "  messages:    {}", c.messages);
    let _ = writeln!(out, "  sent:        {}", c.sent);
    let _ = writeln!(out, "  attachments: {}", c.attachments);
    let _ = writeln!(out, "  skipped:     {}", c.skipped);
    let _ = writeln!(out, "  errors:      {}", c.errors);
    let _ = write!(out, "  elapsed:     {:.1}s", result.elapsed.as_secs_f64());
    out
}

/// Human-readable channel statistics.
pub fn preview_text(stats: &PreviewStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{} ({}, {})", stats.name, stats.kind, stats.channel_id);
    if let Some(topic) = stats.topic.as_deref().filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "  topic:       {topic}");
    }
    let _ = writeln!(out, "  created:     {}", date(stats.created_at));
    let _ = writeln!(out, "  messages:    {}", stats.total_messages);
    let _ = writeln!(out, "  pinned:      {}", stats.pinned_messages);
    let _ = writeln!(out, "  text only:   {}", stats.text_only);
    let _ = writeln!(out, "  with images: {}", stats.with_images);
    let _ = writeln!(out, "  with files:  {}", stats.with_files);
    let _ = writeln!(out, "  bots:        {}", stats.bot_messages);
    let _ = writeln!(out, "  system:      {}", stats.system_messages);
    let _ = writeln!(out, "  authors:     {}", stats.unique_authors);
    let _ = write!(out, "  attachments: {}", megabytes(stats.attachment_bytes));
    if let (Some(first), Some(last)) = (stats.first_message_at, stats.last_message_at) {
        let _ = write!(out, "\n  span:        {} .. {}", date(first), date(last));
    }
    out
}

fn date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[allow(clippy::cast_precision_loss)]
fn megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use forumlift_core::{ChannelId, ChannelKind, MigrationCounts, PostRef};

    use super::*;

    #[test]
    fn migration_summary() {
        let result = MigrationResult {
            post: PostRef {
                id: ChannelId::new(5),
                url: "https://discord.com/channels/1/5".into(),
            },
            title: "General".into(),
            counts: MigrationCounts {
                messages: 10,
                attachments: 2,
                skipped: 1,
                errors: 1,
                sent: 8,
            },
            elapsed: Duration::from_millis(12_340),
        };
        let text = migration_text(&result);
        assert!(text.starts_with("Migrated to https://discord.com/channels/1/5\n"));
        assert!(text.contains("  sent:        8\n"));
        assert!(text.ends_with("elapsed:     12.3s"));
    }

    #[test]
    fn preview_summary() {
        let stats = PreviewStats {
            channel_id: ChannelId::new(9),
            name: "general".into(),
            kind: ChannelKind::Text,
            topic: None,
            created_at: Utc.with_ymd_and_hms(2021, 5, 1, 8, 30, 0).unwrap(),
            total_messages: 42,
            pinned_messages: 3,
            text_only: 30,
            with_images: 8,
            with_files: 4,
            bot_messages: 2,
            system_messages: 1,
            unique_authors: 7,
            attachment_bytes: 3 * 1024 * 1024,
            first_message_at: None,
            last_message_at: None,
        };
        let text = preview_text(&stats);
        assert!(text.starts_with("#general (text, 9)\n"));
        assert!(text.contains("created:     2021-05-01 08:30 UTC"));
        assert!(text.ends_with("attachments: 3.0 MB"));
        assert!(!text.contains("topic"));
    }
}
