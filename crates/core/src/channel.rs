use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ChannelId, GuildId, TagId};

/// The kind of a channel, as far as migration cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Plain text chat channel.
    Text,
    /// Announcement (news) channel.
    Announcement,
    /// Forum channel whose children are posts.
    Forum,
    /// Media channel, a forum variant for file-first posts.
    Media,
    /// Voice or stage channel.
    Voice,
    /// Thread or forum post.
    Thread,
    /// Category container.
    Category,
    /// Anything else.
    Other,
}

impl ChannelKind {
    /// Whether messages can be migrated out of this kind of channel.
    pub fn is_migration_source(self) -> bool {
        matches!(self, Self::Text | Self::Announcement)
    }

    /// Whether posts can be created in this kind of channel.
    pub fn is_forum_like(self) -> bool {
        matches!(self, Self::Forum | Self::Media)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Announcement => "announcement",
            Self::Forum => "forum",
            Self::Media => "media",
            Self::Voice => "voice",
            Self::Thread => "thread",
            Self::Category => "category",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A permission the migrating account needs on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// See the channel.
    View,
    /// Read message history.
    ReadHistory,
    /// Send messages.
    Send,
    /// Create and delete send-identity proxies (webhooks).
    ManageSendProxy,
    /// Create posts in a forum.
    CreatePost,
}

impl Capability {
    /// Capabilities required on the source channel.
    pub const SOURCE: &'static [Capability] = &[Capability::View, Capability::ReadHistory];

    /// Capabilities required on the destination forum.
    pub const DESTINATION: &'static [Capability] = &[
        Capability::View,
        Capability::Send,
        Capability::ManageSendProxy,
        Capability::CreatePost,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::View => "view channel",
            Self::ReadHistory => "read message history",
            Self::Send => "send messages",
            Self::ManageSendProxy => "manage webhooks",
            Self::CreatePost => "create posts",
        };
        f.write_str(name)
    }
}

/// A tag that can be applied to forum posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumTag {
    /// Tag id.
    pub id: TagId,
    /// Tag name as shown to users.
    pub name: String,
}

/// Channel metadata plus the migrating account's effective capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel id.
    pub id: ChannelId,
    /// Owning guild.
    pub guild_id: GuildId,
    /// Channel name.
    pub name: String,
    /// Channel kind.
    pub kind: ChannelKind,
    /// Channel topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Parent category or forum.
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
    /// Tags available on a forum; empty for other kinds.
    #[serde(default)]
    pub available_tags: Vec<ForumTag>,
    /// Whether posts in this forum must carry at least one tag.
    #[serde(default)]
    pub requires_tag: bool,
    /// What the migrating account is allowed to do here.
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
}

impl ChannelInfo {
    /// Creation time derived from the channel id.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.id.created_at()
    }

    /// Capabilities from `required` that this channel does not grant.
    pub fn missing(&self, required: &[Capability]) -> Vec<Capability> {
        required
            .iter()
            .copied()
            .filter(|c| !self.capabilities.contains(c))
            .collect()
    }

    /// Find a tag by name, ignoring case.
    pub fn find_tag(&self, name: &str) -> Option<&ForumTag> {
        let wanted = name.trim().to_lowercase();
        self.available_tags
            .iter()
            .find(|t| t.name.to_lowercase() == wanted)
    }

    /// Public link to this channel or post.
    pub fn jump_url(&self) -> String {
        channel_url(self.guild_id, self.id)
    }
}

/// Public link to a channel or post in a guild.
pub fn channel_url(guild_id: GuildId, channel_id: ChannelId) -> String {
    format!("https://discord.com/channels/{guild_id}/{channel_id}")
}
