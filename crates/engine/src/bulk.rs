use forumlift_core::{MigrationRequest, MigrationResult};
use forumlift_platform::{Platform, ProxySender};
use tracing::{info, instrument};

use crate::error::MigrationError;
use crate::orchestrator::Migrator;
use crate::progress::{ProgressEvent, notify};

/// Result of one run in a bulk job.
#[derive(Debug)]
pub struct BulkOutcome {
    /// The request that was run.
    pub request: MigrationRequest,
    /// What the run returned.
    pub result: Result<MigrationResult, MigrationError>,
}

impl<P: Platform + ProxySender> Migrator<P> {
    /// Run several migrations one after another.
    ///
    /// A failed run does not stop the job. Between runs the job waits
    /// [`EngineConfig::channel_cooldown`](crate::EngineConfig::channel_cooldown)
    /// to stay clear of platform rate limits.
    #[instrument(skip_all, fields(runs = requests.len()))]
    pub async fn migrate_all(&self, requests: &[MigrationRequest]) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            if index > 0 {
                let wait = self.config().channel_cooldown;
                notify(
                    self.progress(),
                    ProgressEvent::Cooldown {
                        remaining: requests.len() - index,
                        wait,
                    },
                )
                .await;
                tokio::time::sleep(wait).await;
            }

            let result = self.migrate(request).await;
            outcomes.push(BulkOutcome {
                request: request.clone(),
                result,
            });
        }

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(succeeded = outcomes.len() - failed, failed, "bulk job finished");
        outcomes
    }
}
