use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use forumlift_core::{
    Attachment, Embed, OutgoingFile, OutgoingPayload, PlatformLimits, SourceMessage,
};
use forumlift_platform::Platform;
use regex::{Captures, Regex};
use tracing::{debug, warn};

/// Placed above the text of a message that replied to another one. Reply
/// targets cannot be linked across migrated ids.
pub const REPLY_MARKER: &str = "-# ↪ *Reply to an earlier message*";

/// Display name used when sanitizing leaves nothing.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Marks text cut short to fit the message limit.
pub const ELLIPSIS: &str = "…";

/// Embeds the platform accepts on one message.
const MAX_EMBEDS: usize = 10;

/// Words the platform refuses in proxy display names.
static RESERVED_NAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)discord|clyde").expect("reserved name regex is valid"));

/// Small-caption rendering of a creation time, appended to every message.
pub fn timestamp_suffix(at: DateTime<Utc>) -> String {
    format!("-# <t:{}:f>", at.timestamp())
}

/// Make a display name acceptable as a proxy username.
///
/// The name is trimmed to `max_chars`, reserved words get one letter swapped
/// for a look-alike, code fences are defused, and an empty result becomes
/// [`UNKNOWN_USER`].
pub fn sanitize_username(name: &str, max_chars: usize) -> String {
    let trimmed: String = name.trim().chars().take(max_chars).collect();
    let replaced = RESERVED_NAMES.replace_all(&trimmed, |caps: &Captures<'_>| disguise(&caps[0]));
    let cleaned = replaced.replace("```", "'''");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        UNKNOWN_USER.to_owned()
    } else {
        cleaned.to_owned()
    }
}

/// Swap `i`/`e` for their Cyrillic look-alikes.
fn disguise(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            'i' => 'і',
            'I' => 'І',
            'e' => 'е',
            'E' => 'Е',
            other => other,
        })
        .collect()
}

/// Join `text`, `notes`, and `suffix` into one message of at most
/// `max_chars` characters.
///
/// When the whole does not fit, `text` is cut and marked with [`ELLIPSIS`].
/// Notes are only cut when they alone overflow. The result always ends with
/// `suffix`.
pub fn compose_content(text: &str, notes: &[String], suffix: &str, max_chars: usize) -> String {
    let notes = notes.join("\n");
    let join = |parts: &[&str]| -> String {
        parts
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    };

    let full = join(&[text, notes.as_str(), suffix]);
    if full.chars().count() <= max_chars {
        return full;
    }

    let tail = join(&[notes.as_str(), suffix]);
    let reserved = tail.chars().count() + 1 + ELLIPSIS.chars().count();
    if let Some(budget) = max_chars.checked_sub(reserved).filter(|b| *b > 0) {
        if !text.is_empty() {
            let cut: String = text.chars().take(budget).collect();
            return format!("{}{ELLIPSIS}\n{tail}", cut.trim_end());
        }
    }

    let body = join(&[text, notes.as_str()]);
    let budget = max_chars.saturating_sub(suffix.chars().count() + 1 + ELLIPSIS.chars().count());
    let cut: String = body.chars().take(budget).collect();
    format!("{cut}{ELLIPSIS}\n{suffix}")
}

/// Cut `text` to at most `max_chars` characters, marking the cut with
/// [`ELLIPSIS`].
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let cut: String = text
        .chars()
        .take(max_chars.saturating_sub(ELLIPSIS.chars().count()))
        .collect();
    format!("{cut}{ELLIPSIS}")
}

#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / MIB)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

/// Builds the outgoing payload for one source message.
pub struct Transformer<'a, P> {
    platform: &'a P,
    limits: &'a PlatformLimits,
}

impl<'a, P: Platform> Transformer<'a, P> {
    /// Create a transformer that downloads attachments through `platform`.
    pub fn new(platform: &'a P, limits: &'a PlatformLimits) -> Self {
        Self { platform, limits }
    }

    /// Build the payload for `message`, or `None` when nothing in it can be
    /// migrated.
    ///
    /// Attachments that are too large, fail to download, or exceed the
    /// per-message file cap are replaced by a visible note; they never fail
    /// the message.
    pub async fn transform(&self, message: &SourceMessage) -> Option<OutgoingPayload> {
        let (files, notes) = self.collect_files(&message.attachments).await;

        let embeds: Vec<Embed> = message
            .embeds
            .iter()
            .filter(|e| e.is_rich())
            .take(MAX_EMBEDS)
            .cloned()
            .collect();

        let has_text = !message.content.trim().is_empty();
        let has_payload = has_text
            || message.reply_to.is_some()
            || !message.stickers.is_empty()
            || !files.is_empty()
            || !notes.is_empty()
            || !embeds.is_empty();
        if !has_payload {
            debug!(message_id = %message.id, "message has nothing to migrate");
            return None;
        }

        let mut parts: Vec<String> = Vec::new();
        if message.reply_to.is_some() {
            parts.push(REPLY_MARKER.to_owned());
        }
        if has_text {
            parts.push(message.content.clone());
        }
        if !message.stickers.is_empty() {
            let names: Vec<&str> = message.stickers.iter().map(|s| s.name.as_str()).collect();
            parts.push(format!("*[Sticker: {}]*", names.join(", ")));
        }

        let content = compose_content(
            &parts.join("\n"),
            &notes,
            &timestamp_suffix(message.created_at),
            self.limits.max_message_chars,
        );

        Some(OutgoingPayload {
            content,
            username: sanitize_username(
                message.author.display_name(),
                self.limits.max_username_chars,
            ),
            avatar_url: message.author.avatar_url_sized(self.limits.avatar_size),
            embeds,
            files,
        })
    }

    async fn collect_files(&self, attachments: &[Attachment]) -> (Vec<OutgoingFile>, Vec<String>) {
        let mut files = Vec::new();
        let mut notes = Vec::new();
        let mut omitted = 0usize;

        for attachment in attachments {
            if files.len() >= self.limits.max_files_per_message {
                omitted += 1;
                continue;
            }

            if attachment.size > self.limits.max_upload_bytes {
                notes.push(format!(
                    "⚠️ Skipped large file: `{}` ({})",
                    attachment.filename,
                    human_size(attachment.size)
                ));
                continue;
            }

            match self.platform.download(&attachment.url).await {
                Ok(data) => files.push(OutgoingFile {
                    filename: attachment.filename.clone(),
                    content_type: attachment.content_type.clone(),
                    description: attachment.description.clone(),
                    data,
                }),
                Err(e) => {
                    warn!(filename = %attachment.filename, error = %e, "attachment download failed");
                    notes.push(format!(
                        "⚠️ Could not transfer `{}`: {e}",
                        attachment.filename
                    ));
                }
            }
        }

        if omitted > 0 {
            notes.push(format!(
                "⚠️ {omitted} more attachment(s) omitted (limit is {} per message)",
                self.limits.max_files_per_message
            ));
        }

        (files, notes)
    }
}
