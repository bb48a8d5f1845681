use std::path::PathBuf;

use clap::Args;
use forumlift_discord::DiscordClient;
use forumlift_engine::Migrator;
use serde_json::json;
use tracing::info;

use crate::OutputFormat;
use crate::config::BulkPlan;
use crate::output::migration_text;

#[derive(Args, Debug)]
pub struct BulkArgs {
    /// TOML file with one `[[migration]]` table per channel.
    pub plan: PathBuf,
}

pub async fn run(
    migrator: &Migrator<DiscordClient>,
    args: &BulkArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let plan = BulkPlan::load(&args.plan)?;
    if plan.migrations.is_empty() {
        anyhow::bail!("{} contains no [[migration]] entries", args.plan.display());
    }

    let outcomes = migrator.migrate_all(&plan.migrations).await;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(total = outcomes.len(), failed, "bulk run finished");

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = outcomes
                .iter()
                .map(|o| match &o.result {
                    Ok(result) => json!({ "request": o.request, "result": result }),
                    Err(e) => json!({ "request": o.request, "error": e.to_string() }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(result) => println!("{}\n", migration_text(result)),
                    Err(e) => println!(
                        "Failed {} -> {}: {e}\n",
                        outcome.request.source, outcome.request.destination
                    ),
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} migrations failed", outcomes.len());
    }
    Ok(())
}
