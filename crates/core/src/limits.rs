use serde::{Deserialize, Serialize};

/// Hard limits imposed by the destination platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformLimits {
    /// Maximum characters in one message.
    pub max_message_chars: usize,
    /// Maximum characters in a post title.
    pub max_title_chars: usize,
    /// Maximum characters in a channel topic.
    pub max_topic_chars: usize,
    /// Maximum characters in a proxy display name.
    pub max_username_chars: usize,
    /// Largest file that can be uploaded, in bytes.
    pub max_upload_bytes: u64,
    /// Maximum files on one message.
    pub max_files_per_message: usize,
    /// Square resolution requested for author avatars.
    pub avatar_size: u32,
}

impl Default for PlatformLimits {
    fn default() -> Self {
        Self {
            max_message_chars: 2000,
            max_title_chars: 100,
            max_topic_chars: 1024,
            max_username_chars: 80,
            max_upload_bytes: 25 * 1024 * 1024,
            max_files_per_message: 10,
            avatar_size: 128,
        }
    }
}
