use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelInfo, ChannelKind};
use crate::id::ChannelId;

/// Read-only statistics about a channel that could be migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewStats {
    /// Channel id.
    pub channel_id: ChannelId,
    /// Channel name.
    pub name: String,
    /// Channel kind.
    pub kind: ChannelKind,
    /// Channel topic.
    pub topic: Option<String>,
    /// Channel creation time.
    pub created_at: DateTime<Utc>,
    /// Every message in the history.
    pub total_messages: u64,
    /// Pinned messages.
    pub pinned_messages: u64,
    /// Messages with text and no attachments.
    pub text_only: u64,
    /// Messages with at least one image attachment.
    pub with_images: u64,
    /// Messages with at least one non-image attachment.
    pub with_files: u64,
    /// Messages written by bots.
    pub bot_messages: u64,
    /// Platform-generated system messages.
    pub system_messages: u64,
    /// Distinct authors.
    pub unique_authors: u64,
    /// Declared size of all attachments, in bytes.
    pub attachment_bytes: u64,
    /// Creation time of the oldest message.
    pub first_message_at: Option<DateTime<Utc>>,
    /// Creation time of the newest message.
    pub last_message_at: Option<DateTime<Utc>>,
}

impl PreviewStats {
    /// Empty statistics for a channel.
    pub fn empty(channel: &ChannelInfo) -> Self {
        Self {
            channel_id: channel.id,
            name: channel.name.clone(),
            kind: channel.kind,
            topic: channel.topic.clone(),
            created_at: channel.created_at(),
            total_messages: 0,
            pinned_messages: 0,
            text_only: 0,
            with_images: 0,
            with_files: 0,
            bot_messages: 0,
            system_messages: 0,
            unique_authors: 0,
            attachment_bytes: 0,
            first_message_at: None,
            last_message_at: None,
        }
    }
}
