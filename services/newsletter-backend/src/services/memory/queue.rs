use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::ports::secondary::{JobQueue, QueueError};
use crate::domain::{ConfirmationJob, QueuedJob};

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pending,
    Running,
    Failed,
}

#[derive(Debug, Clone)]
struct Entry {
    queued: QueuedJob,
    status: Status,
    visible_at: DateTime<Utc>,
    last_error: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Entry>,
    // Every job ever enqueued, in order. Never pruned.
    enqueued: Vec<ConfirmationJob>,
}

#[derive(Debug)]
pub struct InMemoryQueue {
    state: Mutex<State>,
    visibility_timeout: Duration,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        InMemoryQueue::new(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        InMemoryQueue {
            state: Mutex::new(State::default()),
            visibility_timeout,
        }
    }

    /// All jobs enqueued so far, whether they were processed or not.
    pub async fn enqueued(&self) -> Vec<ConfirmationJob> {
        self.state.lock().await.enqueued.clone()
    }

    /// Jobs still waiting to be delivered, or being processed.
    pub async fn pending(&self) -> Vec<QueuedJob> {
        self.jobs_with(|status| status != Status::Failed).await
    }

    /// Jobs that exhausted their attempts, with the last error recorded.
    pub async fn failed(&self) -> Vec<(QueuedJob, Option<String>)> {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .filter(|entry| entry.status == Status::Failed)
            .map(|entry| (entry.queued.clone(), entry.last_error.clone()))
            .collect()
    }

    async fn jobs_with<F: Fn(Status) -> bool>(&self, f: F) -> Vec<QueuedJob> {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .filter(|entry| f(entry.status))
            .map(|entry| entry.queued.clone())
            .collect()
    }
}

fn after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    #[tracing::instrument(name = "Enqueuing a confirmation job in memory", skip(self))]
    async fn enqueue(&self, job: ConfirmationJob) -> Result<QueuedJob, QueueError> {
        let now = Utc::now();
        let queued = QueuedJob {
            id: Uuid::new_v4(),
            job,
            attempts: 0,
            created_at: now,
        };
        let mut state = self.state.lock().await;
        state.enqueued.push(job);
        state.entries.push(Entry {
            queued: queued.clone(),
            status: Status::Pending,
            visible_at: now,
            last_error: None,
        });
        Ok(queued)
    }

    async fn next(&self) -> Result<Option<QueuedJob>, QueueError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        // Running jobs whose visibility expired are delivered again.
        let entry = state
            .entries
            .iter_mut()
            .filter(|entry| entry.status != Status::Failed && entry.visible_at <= now)
            .min_by_key(|entry| entry.queued.created_at);
        Ok(entry.map(|entry| {
            entry.status = Status::Running;
            entry.visible_at = after(now, self.visibility_timeout);
            entry.queued.attempts += 1;
            entry.queued.clone()
        }))
    }

    async fn complete(&self, id: &Uuid) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let index = state
            .entries
            .iter()
            .position(|entry| &entry.queued.id == id)
            .ok_or_else(|| QueueError::Missing {
                context: format!("In Memory Queue: cannot complete job {id}"),
            })?;
        state.entries.remove(index);
        Ok(())
    }

    async fn fail(
        &self,
        id: &Uuid,
        reason: &str,
        retry_in: Option<Duration>,
    ) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let entry = state
            .entries
            .iter_mut()
            .find(|entry| &entry.queued.id == id)
            .ok_or_else(|| QueueError::Missing {
                context: format!("In Memory Queue: cannot fail job {id}"),
            })?;
        entry.last_error = Some(reason.to_string());
        match retry_in {
            Some(delay) => {
                entry.status = Status::Pending;
                entry.visible_at = after(Utc::now(), delay);
            }
            None => entry.status = Status::Failed,
        }
        Ok(())
    }
}
