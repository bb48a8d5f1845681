use clap::Args;
use forumlift_core::ChannelId;
use forumlift_discord::DiscordClient;
use forumlift_engine::Migrator;

use crate::OutputFormat;
use crate::output::preview_text;

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Channel to inspect.
    pub channel: ChannelId,
}

pub async fn run(
    migrator: &Migrator<DiscordClient>,
    args: &PreviewArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let stats = migrator.preview(args.channel).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Text => {
            println!("{}", preview_text(&stats));
        }
    }

    Ok(())
}
