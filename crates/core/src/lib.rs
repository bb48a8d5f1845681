//! Core types shared by the forumlift migration engine and its platform
//! bindings.
//!
//! Everything in here is plain data: snapshots read from the source channel,
//! the request and result of a migration run, preview statistics, and the
//! payload handed to a send-identity proxy.

pub mod channel;
pub mod embed;
pub mod id;
pub mod limits;
pub mod message;
pub mod migration;
pub mod payload;
pub mod preview;

pub use channel::{Capability, ChannelInfo, ChannelKind, ForumTag, channel_url};
pub use embed::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedKind, EmbedMedia};
pub use id::{ChannelId, GuildId, MessageId, ProxyId, RoleId, TagId, UserId};
pub use limits::PlatformLimits;
pub use message::{Attachment, Author, SourceMessage, Sticker};
pub use migration::{MigrationCounts, MigrationRequest, MigrationResult, PostRef};
pub use payload::{OutgoingFile, OutgoingPayload};
pub use preview::PreviewStats;
