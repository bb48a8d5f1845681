use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embed::Embed;
use crate::id::{MessageId, UserId};

/// Identity of the account that wrote a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Account id.
    pub id: UserId,
    /// Unique account handle.
    pub username: String,
    /// Platform-wide display name, if the user set one.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Display name inside the source guild (nickname), if any.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Full avatar URL, if the user has an avatar.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Whether the account is a bot.
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    /// The name a reader of the source channel saw next to the message.
    ///
    /// Guild nickname first, then the platform display name, then the
    /// username. Blank names are skipped.
    pub fn display_name(&self) -> &str {
        [self.nickname.as_deref(), self.global_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }

    /// Avatar URL pinned to a fixed square resolution.
    pub fn avatar_url_sized(&self, size: u32) -> Option<String> {
        self.avatar_url.as_deref().map(|url| {
            let base = url.split_once('?').map_or(url, |(base, _)| base);
            format!("{base}?size={size}")
        })
    }
}

/// A file attached to a source message.
///
/// The URL is time-limited and may already be expired when the message is
/// replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name.
    pub filename: String,
    /// Declared size in bytes.
    pub size: u64,
    /// MIME type hint, when the platform supplied one.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Download URL.
    pub url: String,
    /// Alt text.
    #[serde(default)]
    pub description: Option<String>,
}

impl Attachment {
    /// Whether the content type hint marks this attachment as an image.
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// A sticker reference. Stickers cannot be re-sent through a proxy identity,
/// so only the name is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticker {
    /// Sticker name.
    pub name: String,
}

/// Immutable snapshot of one message in the source channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMessage {
    /// Message id.
    pub id: MessageId,
    /// Author identity.
    pub author: Author,
    /// Raw text content; empty when the message carries none.
    #[serde(default)]
    pub content: String,
    /// Attachments in display order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Embeds, including auto-generated link previews.
    #[serde(default)]
    pub embeds: Vec<Embed>,
    /// Sticker references.
    #[serde(default)]
    pub stickers: Vec<Sticker>,
    /// Id of the message this one replies to.
    #[serde(default)]
    pub reply_to: Option<MessageId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether this is a platform-generated system message (joins, pins,
    /// boosts, thread notices).
    #[serde(default)]
    pub system: bool,
    /// Whether the message is pinned.
    #[serde(default)]
    pub pinned: bool,
}

impl SourceMessage {
    /// True when the message has no text, attachment, embed, or sticker.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
            && self.attachments.is_empty()
            && self.embeds.is_empty()
            && self.stickers.is_empty()
    }

    /// Sum of declared attachment sizes.
    pub fn attachment_bytes(&self) -> u64 {
        self.attachments.iter().map(|a| a.size).sum()
    }
}
