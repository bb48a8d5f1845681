use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use forumlift_core::{
    Attachment, Author, Capability, ChannelId, ChannelInfo, ChannelKind, Embed, ForumTag,
    GuildId, MessageId, OutgoingPayload, ProxyId, RoleId, SourceMessage, Sticker, TagId, UserId,
};
use serde::{Deserialize, Deserializer, Serialize};

/// CDN root for user avatars.
pub const CDN_BASE: &str = "https://cdn.discordapp.com";

/// Channel flag set on forums that require a tag on every post.
pub const FLAG_REQUIRE_TAG: u64 = 1 << 4;

/// Message types that carry user content; everything else is a system
/// message (joins, pins, boosts, thread notices, ...).
const CONTENT_MESSAGE_TYPES: [u8; 4] = [0, 19, 20, 23];

/// Error body returned with non-success responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Discord's JSON error code.
    #[serde(default)]
    pub code: Option<u64>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds to wait, on 429 responses.
    #[serde(default)]
    pub retry_after: Option<f64>,
}

/// A channel object.
#[derive(Debug, Clone, Deserialize)]
pub struct WireChannel {
    /// Channel id.
    pub id: ChannelId,
    /// Numeric channel type.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Owning guild; absent for DMs.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Channel name.
    #[serde(default)]
    pub name: Option<String>,
    /// Channel topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Parent category or forum.
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
    /// Channel flags bitfield.
    #[serde(default)]
    pub flags: u64,
    /// Forum tags.
    #[serde(default)]
    pub available_tags: Vec<WireTag>,
    /// Permission overwrites.
    #[serde(default)]
    pub permission_overwrites: Vec<WireOverwrite>,
}

impl WireChannel {
    /// Convert to core channel info with the given effective capabilities.
    pub fn into_info(self, guild_id: GuildId, capabilities: BTreeSet<Capability>) -> ChannelInfo {
        ChannelInfo {
            id: self.id,
            guild_id,
            name: self.name.unwrap_or_default(),
            kind: channel_kind(self.kind),
            topic: self.topic,
            parent_id: self.parent_id,
            available_tags: self
                .available_tags
                .into_iter()
                .map(|t| ForumTag {
                    id: t.id,
                    name: t.name,
                })
                .collect(),
            requires_tag: self.flags & FLAG_REQUIRE_TAG != 0,
            capabilities,
        }
    }
}

/// Map a numeric channel type.
pub fn channel_kind(kind: u8) -> ChannelKind {
    match kind {
        0 => ChannelKind::Text,
        5 => ChannelKind::Announcement,
        15 => ChannelKind::Forum,
        16 => ChannelKind::Media,
        2 | 13 => ChannelKind::Voice,
        10..=12 => ChannelKind::Thread,
        4 => ChannelKind::Category,
        _ => ChannelKind::Other,
    }
}

/// A forum tag.
#[derive(Debug, Clone, Deserialize)]
pub struct WireTag {
    /// Tag id.
    pub id: TagId,
    /// Tag name.
    pub name: String,
}

/// A permission overwrite on a channel.
#[derive(Debug, Clone, Deserialize)]
pub struct WireOverwrite {
    /// Role or user id.
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    /// 0 for a role, 1 for a member.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Allowed bits.
    #[serde(deserialize_with = "bits")]
    pub allow: u64,
    /// Denied bits.
    #[serde(deserialize_with = "bits")]
    pub deny: u64,
}

/// Body of `PUT /channels/{id}/permissions/{overwrite}`.
#[derive(Debug, Clone, Serialize)]
pub struct OverwriteBody {
    /// 0 for a role, 1 for a member.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Allowed bits as a decimal string.
    pub allow: String,
    /// Denied bits as a decimal string.
    pub deny: String,
}

/// The parts of a guild needed to compute permissions.
#[derive(Debug, Clone, Deserialize)]
pub struct WireGuild {
    /// Guild id.
    pub id: GuildId,
    /// Owner account.
    pub owner_id: UserId,
    /// Every role, `@everyone` included.
    #[serde(default)]
    pub roles: Vec<WireRole>,
}

/// A guild role.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRole {
    /// Role id.
    pub id: RoleId,
    /// Permission bits.
    #[serde(deserialize_with = "bits")]
    pub permissions: u64,
}

/// A guild member.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMember {
    /// Guild nickname.
    #[serde(default)]
    pub nick: Option<String>,
    /// Role ids.
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

/// A user account.
#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    /// Account id.
    pub id: UserId,
    /// Account handle.
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Avatar hash.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the account is a bot.
    #[serde(default)]
    pub bot: bool,
}

impl WireUser {
    /// Full CDN URL of the user's avatar, animated when the hash says so.
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.as_deref().map(|hash| {
            let ext = if hash.starts_with("a_") { "gif" } else { "png" };
            format!("{CDN_BASE}/avatars/{}/{hash}.{ext}", self.id)
        })
    }
}

/// A message object.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    /// Message id.
    pub id: MessageId,
    /// Numeric message type.
    #[serde(rename = "type", default)]
    pub kind: u8,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Author.
    pub author: WireUser,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<WireAttachment>,
    /// Embeds.
    #[serde(default)]
    pub embeds: Vec<Embed>,
    /// Stickers.
    #[serde(default)]
    pub sticker_items: Vec<WireSticker>,
    /// Reply or crosspost reference.
    #[serde(default)]
    pub message_reference: Option<WireReference>,
    /// Whether the message is pinned.
    #[serde(default)]
    pub pinned: bool,
}

impl WireMessage {
    /// Convert to a core message. The nickname is resolved separately.
    pub fn into_source(self, nickname: Option<String>) -> SourceMessage {
        let avatar_url = self.author.avatar_url();
        let reply_to = if self.kind == 19 {
            self.message_reference.and_then(|r| r.message_id)
        } else {
            None
        };
        SourceMessage {
            id: self.id,
            author: Author {
                id: self.author.id,
                username: self.author.username,
                global_name: self.author.global_name,
                nickname,
                avatar_url,
                bot: self.author.bot,
            },
            content: self.content,
            attachments: self
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    filename: a.filename,
                    size: a.size,
                    content_type: a.content_type,
                    url: a.url,
                    description: a.description,
                })
                .collect(),
            embeds: self.embeds,
            stickers: self
                .sticker_items
                .into_iter()
                .map(|s| Sticker { name: s.name })
                .collect(),
            reply_to,
            created_at: self.timestamp,
            system: !CONTENT_MESSAGE_TYPES.contains(&self.kind),
            pinned: self.pinned,
        }
    }
}

/// An attachment object.
#[derive(Debug, Clone, Deserialize)]
pub struct WireAttachment {
    /// File name.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Download URL.
    pub url: String,
    /// MIME type.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Alt text.
    #[serde(default)]
    pub description: Option<String>,
}

/// A sticker item.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSticker {
    /// Sticker name.
    pub name: String,
}

/// A message reference.
#[derive(Debug, Clone, Deserialize)]
pub struct WireReference {
    /// Referenced message.
    #[serde(default)]
    pub message_id: Option<MessageId>,
}

/// Body of `POST /channels/{forum}/threads`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePostBody<'a> {
    /// Post title.
    pub name: &'a str,
    /// Opening message.
    pub message: MessageBody<'a>,
    /// Tags to apply.
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub applied_tags: &'a [TagId],
}

/// Body of a plain message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageBody<'a> {
    /// Text content.
    pub content: &'a str,
    /// Mentions to resolve; always empty so migrated text pings nobody.
    pub allowed_mentions: AllowedMentions,
}

impl<'a> MessageBody<'a> {
    /// A message that mentions nobody.
    pub fn quiet(content: &'a str) -> Self {
        Self {
            content,
            allowed_mentions: AllowedMentions::default(),
        }
    }
}

/// Mention parsing rules.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AllowedMentions {
    /// Mention kinds to parse.
    pub parse: Vec<String>,
}

/// Body of `POST /channels/{id}/webhooks`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateWebhookBody<'a> {
    /// Webhook name.
    pub name: &'a str,
}

/// A webhook object.
#[derive(Debug, Clone, Deserialize)]
pub struct WireWebhook {
    /// Webhook id.
    pub id: ProxyId,
    /// Execution token; only present for incoming webhooks the caller owns.
    #[serde(default)]
    pub token: Option<String>,
}

/// JSON part of a webhook execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteWebhookBody<'a> {
    /// The payload fields.
    #[serde(flatten)]
    pub payload: &'a OutgoingPayload,
    /// Metadata of the uploaded files, matched to `files[n]` parts by id.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef<'a>>,
    /// Mentions to resolve.
    pub allowed_mentions: AllowedMentions,
}

/// Metadata of one uploaded file.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentRef<'a> {
    /// Index of the `files[n]` part.
    pub id: usize,
    /// File name.
    pub filename: &'a str,
    /// Alt text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

impl<'a> ExecuteWebhookBody<'a> {
    /// Body for `payload`, listing its files.
    pub fn new(payload: &'a OutgoingPayload) -> Self {
        Self {
            payload,
            attachments: payload
                .files
                .iter()
                .enumerate()
                .map(|(id, f)| AttachmentRef {
                    id,
                    filename: &f.filename,
                    description: f.description.as_deref(),
                })
                .collect(),
            allowed_mentions: AllowedMentions::default(),
        }
    }
}

/// A thread or post object, as returned on creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedChannel {
    /// Channel id.
    pub id: ChannelId,
}

fn snowflake<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    UserId::deserialize(deserializer).map(UserId::get)
}

fn bits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    // Same wire shape as a snowflake: a decimal string.
    snowflake(deserializer)
}
