use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use forumlift_core::{ChannelId, MigrationCounts};
use thiserror::Error;
use tracing::{debug, info};

/// Stage of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Checking channel kinds and capabilities.
    Validating,
    /// Reading the source history.
    Fetching,
    /// Creating the destination post and proxy.
    CreatingPost,
    /// Sending messages into the post.
    Replaying,
    /// Deleting the proxy.
    CleaningUp,
    /// Notifying and optionally locking the source.
    Finalizing,
    /// Finished with a result.
    Done,
    /// Finished with an error.
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::CreatingPost => "creating post",
            Self::Replaying => "replaying",
            Self::CleaningUp => "cleaning up",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A progress notification emitted while fetching, migrating, or running a
/// bulk job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The run entered a new stage.
    Stage {
        /// Source channel of the run.
        source: ChannelId,
        /// The new stage.
        stage: RunStage,
    },
    /// History pages fetched so far.
    Fetched {
        /// Channel being read.
        channel: ChannelId,
        /// Pages fetched.
        batches: usize,
        /// Messages fetched.
        messages: usize,
    },
    /// Messages replayed so far.
    Replayed {
        /// Source channel of the run.
        source: ChannelId,
        /// Messages processed.
        processed: u64,
        /// Messages in the run.
        total: u64,
        /// Running counters.
        counts: MigrationCounts,
    },
    /// A bulk job is waiting before its next run.
    Cooldown {
        /// Runs left.
        remaining: usize,
        /// How long the job waits.
        wait: Duration,
    },
}

/// Failure to deliver a progress notification.
#[derive(Debug, Error)]
#[error("progress report failed: {0}")]
pub struct ProgressError(pub String);

/// Receives progress notifications.
///
/// Implementations may fail (for example when the interaction they report
/// into has expired); the engine logs the failure and carries on.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Deliver one notification.
    async fn report(&self, event: &ProgressEvent) -> Result<(), ProgressError>;
}

/// Deliver `event`, logging and discarding any failure.
pub(crate) async fn notify(sink: &dyn ProgressSink, event: ProgressEvent) {
    if let Err(e) = sink.report(&event).await {
        debug!(error = %e, ?event, "progress report dropped");
    }
}

/// A sink that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn report(&self, _event: &ProgressEvent) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// A sink that logs every notification through `tracing` and never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn report(&self, event: &ProgressEvent) -> Result<(), ProgressError> {
        match event {
            ProgressEvent::Stage { source, stage } => {
                info!(%source, %stage, "migration stage");
            }
            ProgressEvent::Fetched {
                channel,
                batches,
                messages,
            } => {
                info!(%channel, batches, messages, "fetching history");
            }
            ProgressEvent::Replayed {
                source,
                processed,
                total,
                counts,
            } => {
                info!(
                    %source,
                    processed,
                    total,
                    sent = counts.sent,
                    skipped = counts.skipped,
                    errors = counts.errors,
                    "replaying messages"
                );
            }
            ProgressEvent::Cooldown { remaining, wait } => {
                info!(remaining, ?wait, "cooling down before next channel");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct ExpiredSink {
        attempts: Mutex<usize>,
    }

    #[async_trait]
    impl ProgressSink for ExpiredSink {
        async fn report(&self, _event: &ProgressEvent) -> Result<(), ProgressError> {
            *self.attempts.lock().unwrap() += 1;
            Err(ProgressError("interaction token expired".into()))
        }
    }

    #[tokio::test]
    async fn notify_swallows_sink_failures() {
        let sink = ExpiredSink {
            attempts: Mutex::new(0),
        };
        notify(
            &sink,
            ProgressEvent::Stage {
                source: ChannelId::new(1),
                stage: RunStage::Fetching,
            },
        )
        .await;
        assert_eq!(*sink.attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn log_progress_never_fails() {
        let event = ProgressEvent::Cooldown {
            remaining: 2,
            wait: Duration::from_secs(30),
        };
        assert!(LogProgress.report(&event).await.is_ok());
        assert!(NoProgress.report(&event).await.is_ok());
    }

    #[test]
    fn stage_display() {
        assert_eq!(RunStage::CreatingPost.to_string(), "creating post");
        assert_eq!(RunStage::CleaningUp.to_string(), "cleaning up");
    }
}
