//! Migration engine for moving a chat channel's history into a forum post.
//!
//! The engine is built from three parts:
//!
//! - [`HistoryFetcher`] reads a channel's history page by page and returns
//!   it oldest first.
//! - [`Transformer`] turns one source message into the payload for the
//!   send-identity proxy: author identity, timestamp, files within limits,
//!   and visible notes for anything that could not be carried over.
//! - [`Migrator`] validates a [`MigrationRequest`](forumlift_core::MigrationRequest),
//!   creates the destination post, replays every message through a proxy,
//!   and cleans up.
//!
//! All platform access goes through the traits in `forumlift-platform`, so
//! the engine runs unchanged against the real API or the in-memory fake.
//!
//! ```no_run
//! use forumlift_core::{ChannelId, MigrationRequest};
//! use forumlift_engine::{EngineConfig, Migrator};
//! # async fn run<P>(platform: P) -> Result<(), forumlift_engine::MigrationError>
//! # where P: forumlift_platform::Platform + forumlift_platform::ProxySender {
//! let migrator = Migrator::new(platform, EngineConfig::default());
//! let request = MigrationRequest::new(ChannelId::new(1), ChannelId::new(2)).with_tag("Archive");
//! let result = migrator.migrate(&request).await?;
//! println!("{} messages moved to {}", result.counts.sent, result.post.url);
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod preview;
pub mod progress;
pub mod transform;

pub use bulk::BulkOutcome;
pub use config::{EngineConfig, EngineSection};
pub use error::{ChannelRole, CreationError, MigrationError, MissingCapability, ValidationError};
pub use fetcher::{HistoryFetcher, history_pages};
pub use orchestrator::{FALLBACK_TAG, Migrator, derive_title, header_message, resolve_tags};
pub use preview::summarize;
pub use progress::{LogProgress, NoProgress, ProgressError, ProgressEvent, ProgressSink, RunStage};
pub use transform::Transformer;
