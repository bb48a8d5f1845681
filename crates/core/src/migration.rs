use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::id::ChannelId;

/// What to migrate and where. Built by the caller, never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRequest {
    /// Channel whose history is copied.
    pub source: ChannelId,
    /// Forum that receives the new post.
    pub destination: ChannelId,
    /// Post title; derived from the source channel name when absent.
    #[serde(default)]
    pub title: Option<String>,
    /// Name of a forum tag to apply to the post.
    #[serde(default)]
    pub tag: Option<String>,
    /// Only migrate pinned messages.
    #[serde(default)]
    pub pins_only: bool,
    /// Lock the source channel and point its topic at the new post afterwards.
    #[serde(default)]
    pub archive_source: bool,
}

impl MigrationRequest {
    /// Create a request that migrates the full history of `source` into a
    /// new post in `destination`.
    pub fn new(source: ChannelId, destination: ChannelId) -> Self {
        Self {
            source,
            destination,
            title: None,
            tag: None,
            pins_only: false,
            archive_source: false,
        }
    }

    /// Override the post title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Apply the named forum tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Restrict the migration to pinned messages.
    #[must_use]
    pub fn with_pins_only(mut self, pins_only: bool) -> Self {
        self.pins_only = pins_only;
        self
    }

    /// Lock and annotate the source after migrating.
    #[must_use]
    pub fn with_archive_source(mut self, archive: bool) -> Self {
        self.archive_source = archive;
        self
    }
}

/// Reference to a created forum post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    /// Thread id of the post.
    pub id: ChannelId,
    /// Public link to the post.
    pub url: String,
}

/// Per-run message accounting.
///
/// `messages == skipped + sent + errors` holds for every finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCounts {
    /// Messages processed, whatever their outcome.
    pub messages: u64,
    /// Files transferred into the post.
    pub attachments: u64,
    /// System, empty, or payload-less messages that were not sent.
    pub skipped: u64,
    /// Messages that could not be delivered.
    pub errors: u64,
    /// Messages delivered into the post.
    pub sent: u64,
}

/// Terminal artifact of one successful migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    /// The destination post.
    pub post: PostRef,
    /// Title the post was created with.
    pub title: String,
    /// Final counters.
    pub counts: MigrationCounts,
    /// Wall-clock duration of the run.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

/// Serialize a [`Duration`] as whole milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
