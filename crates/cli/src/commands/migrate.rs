use clap::Args;
use forumlift_core::{ChannelId, MigrationRequest};
use forumlift_discord::DiscordClient;
use forumlift_engine::Migrator;

use crate::OutputFormat;
use crate::output::migration_text;

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Channel to migrate from.
    pub source: ChannelId,
    /// Forum to create the post in.
    pub destination: ChannelId,
    /// Post title; derived from the channel name when omitted.
    #[arg(long)]
    pub title: Option<String>,
    /// Forum tag to apply.
    #[arg(long)]
    pub tag: Option<String>,
    /// Migrate pinned messages only.
    #[arg(long)]
    pub pins_only: bool,
    /// Lock the source channel and point its topic at the new post.
    #[arg(long)]
    pub archive: bool,
}

impl MigrateArgs {
    fn request(&self) -> MigrationRequest {
        MigrationRequest {
            source: self.source,
            destination: self.destination,
            title: self.title.clone(),
            tag: self.tag.clone(),
            pins_only: self.pins_only,
            archive_source: self.archive,
        }
    }
}

pub async fn run(
    migrator: &Migrator<DiscordClient>,
    args: &MigrateArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let result = migrator.migrate(&args.request()).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            println!("{}", migration_text(&result));
        }
    }

    Ok(())
}
