//! forumlift CLI
//!
//! Moves the history of a chat channel into a single forum post.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use forumlift_discord::DiscordClient;
use forumlift_engine::{LogProgress, Migrator};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::FileConfig;

/// forumlift: migrate chat channels into forum posts.
#[derive(Parser, Debug)]
#[command(name = "forumlift", version, about)]
struct Cli {
    /// Bot token used for every API call.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// TOML configuration file.
    #[arg(long, env = "FORUMLIFT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Pause between replayed messages, in milliseconds.
    #[arg(long, env = "MIGRATION_DELAY_MS", global = true)]
    delay_ms: Option<u64>,

    /// Pause between channels in a bulk run, in milliseconds.
    #[arg(long, env = "CHANNEL_COOLDOWN_MS", global = true)]
    cooldown_ms: Option<u64>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate one channel into a new forum post.
    Migrate(commands::migrate::MigrateArgs),
    /// Show statistics for a channel without changing anything.
    Preview(commands::preview::PreviewArgs),
    /// Run every migration listed in a plan file, one after another.
    Bulk(commands::bulk::BulkArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(token) = cli.token.clone().filter(|t| !t.trim().is_empty()) else {
        anyhow::bail!("no bot token: pass --token or set DISCORD_TOKEN");
    };

    let file = FileConfig::load(cli.config.as_deref())?;
    let client = DiscordClient::new(file.discord(token))?;
    let migrator = Migrator::new(client, file.engine(cli.delay_ms, cli.cooldown_ms))
        .with_progress(Arc::new(LogProgress));

    match cli.command {
        Command::Migrate(args) => commands::migrate::run(&migrator, &args, &cli.format).await,
        Command::Preview(args) => commands::preview::run(&migrator, &args, &cli.format).await,
        Command::Bulk(args) => commands::bulk::run(&migrator, &args, &cli.format).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_migrate_flags() {
        let cli = Cli::try_parse_from([
            "forumlift",
            "--token",
            "abc",
            "migrate",
            "111",
            "222",
            "--tag",
            "Archive",
            "--pins-only",
            "--archive",
            "--delay-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(cli.delay_ms, Some(250));
        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        assert_eq!(args.source.get(), 111);
        assert_eq!(args.destination.get(), 222);
        assert_eq!(args.tag.as_deref(), Some("Archive"));
        assert!(args.pins_only && args.archive);
        assert!(args.title.is_none());
    }

    #[test]
    fn rejects_non_numeric_channel() {
        assert!(Cli::try_parse_from(["forumlift", "preview", "general"]).is_err());
    }
}
