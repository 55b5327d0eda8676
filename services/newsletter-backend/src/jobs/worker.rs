use common::settings::WorkerSettings;
use std::sync::Arc;
use std::time::Duration;

use super::confirmation::{ConfirmationHandler, JobOutcome};
use crate::domain::ports::secondary::{JobQueue, QueueError};

/// What happened to the job handed out by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processed {
    Completed(JobOutcome),
    /// The job failed, and will be delivered again later.
    Retrying,
    /// The job failed on its last attempt, and will not be delivered again.
    Abandoned,
}

/// Polls the queue and executes confirmation jobs, one at a time.
pub struct Worker {
    queue: Arc<dyn JobQueue + Send + Sync>,
    handler: ConfirmationHandler,
    poll_interval: Duration,
    max_attempts: i32,
    retry_delay: Duration,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue + Send + Sync>,
        handler: ConfirmationHandler,
        settings: &WorkerSettings,
    ) -> Self {
        Worker {
            queue,
            handler,
            poll_interval: Duration::from_millis(settings.poll_interval),
            max_attempts: settings.max_attempts.max(1),
            retry_delay: Duration::from_secs(settings.retry_delay),
        }
    }

    /// Executes the next due job, if there is one.
    ///
    /// Only queue errors are returned. A failing job is reported to the queue,
    /// which delivers it again until it runs out of attempts.
    pub async fn process_next(&self) -> Result<Option<Processed>, QueueError> {
        let Some(queued) = self.queue.next().await? else {
            return Ok(None);
        };

        match self.handler.execute(&queued.job).await {
            Ok(outcome) => {
                self.queue.complete(&queued.id).await?;
                Ok(Some(Processed::Completed(outcome)))
            }
            Err(err) => {
                let reason = err.to_string();
                if queued.attempts < self.max_attempts {
                    tracing::warn!(
                        job_id = %queued.id,
                        attempts = queued.attempts,
                        "Confirmation job failed, retrying: {reason}"
                    );
                    self.queue
                        .fail(&queued.id, &reason, Some(self.retry_delay))
                        .await?;
                    Ok(Some(Processed::Retrying))
                } else {
                    tracing::error!(
                        job_id = %queued.id,
                        attempts = queued.attempts,
                        "Confirmation job abandoned: {reason}"
                    );
                    self.queue.fail(&queued.id, &reason, None).await?;
                    Ok(Some(Processed::Abandoned))
                }
            }
        }
    }

    /// Processes jobs as long as there are some, then sleeps for the poll interval.
    /// Queue errors are logged, and polling resumes after the same pause.
    pub async fn run_until_stopped(self) {
        tracing::info!(
            poll_interval = ?self.poll_interval,
            max_attempts = self.max_attempts,
            "Confirmation worker started"
        );
        loop {
            match self.process_next().await {
                Ok(Some(processed)) => {
                    tracing::debug!(?processed, "Processed confirmation job");
                }
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(err) => {
                    tracing::error!("Could not process confirmation job: {err}");
                    tokio::time::sleep(self.poll_interval).await
                }
            }
        }
    }
}
