use std::fmt;

use forumlift_core::{Capability, ChannelKind};
use forumlift_platform::PlatformError;
use thiserror::Error;

/// Which side of a migration a channel is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    /// The channel being migrated from.
    Source,
    /// The forum receiving the post.
    Destination,
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// A capability the migrating account lacks on one of the two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingCapability {
    /// Channel the capability is missing on.
    pub channel: ChannelRole,
    /// The missing capability.
    pub capability: Capability,
}

impl fmt::Display for MissingCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} channel", self.capability, self.channel)
    }
}

/// The run cannot start. Raised before anything is created, so the whole
/// call can be retried once the cause is fixed.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The source is not a text or announcement channel.
    #[error("source channel must be a text or announcement channel, got {0}")]
    WrongSourceKind(ChannelKind),

    /// The destination is not a forum.
    #[error("destination channel must be a forum, got {0}")]
    WrongDestinationKind(ChannelKind),

    /// One or more required capabilities are missing. Every gap is listed.
    #[error("missing permissions: {}", join(.0))]
    MissingCapabilities(Vec<MissingCapability>),

    /// The requested tag does not exist on the destination forum.
    #[error("tag {requested:?} not found; available tags: {}", available_list(.available))]
    UnknownTag {
        /// The tag name that was asked for.
        requested: String,
        /// Tag names the forum does have.
        available: Vec<String>,
    },
}

/// The destination post or the send-identity proxy could not be created.
#[derive(Debug, Error)]
pub enum CreationError {
    /// The platform denied access when creating the post.
    #[error("access denied while creating the forum post: {0}")]
    PostAccessDenied(PlatformError),

    /// The platform rejected the post for another reason.
    #[error("failed to create the forum post: {0}")]
    PostFailed(PlatformError),

    /// The send-identity proxy could not be created.
    #[error("failed to create the webhook: {0}")]
    ProxyFailed(PlatformError),
}

/// Fatal errors of a migration run.
///
/// Every variant is raised before a destination post exists, or after the
/// post created by the run has been removed again.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Preconditions on the channels or request failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The source has no messages to migrate.
    #[error("no messages found in the source channel")]
    EmptyChannel,

    /// Reading channel metadata or history failed.
    #[error("failed to read from the platform: {0}")]
    Fetch(#[from] PlatformError),

    /// The post or proxy could not be created.
    #[error(transparent)]
    Creation(#[from] CreationError),
}

fn join(items: &[MissingCapability]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn available_list(tags: &[String]) -> String {
    if tags.is_empty() {
        "(none)".to_owned()
    } else {
        tags.join(", ")
    }
}
