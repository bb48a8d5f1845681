//! Discord binding for the forumlift migration engine.
//!
//! [`DiscordClient`] implements [`Platform`](forumlift_platform::Platform)
//! and [`ProxySender`](forumlift_platform::ProxySender) on top of the
//! [Discord REST API](https://discord.com/developers/docs/reference):
//! channel and permission lookups, paged history, forum post creation, and
//! message replay through a temporary webhook.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use forumlift_discord::{DiscordClient, DiscordConfig};
//!
//! let config = DiscordConfig::new("bot-token");
//! let client = DiscordClient::new(config)?;
//! # Ok::<(), forumlift_discord::DiscordError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod permissions;
pub mod types;

pub use client::DiscordClient;
pub use config::DiscordConfig;
pub use error::DiscordError;
