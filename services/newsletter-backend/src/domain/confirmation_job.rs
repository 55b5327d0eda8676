use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Asks the worker to send a confirmation email for a subscription.
///
/// Only the subscription's id travels with the job: the current record is read
/// back when the job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationJob {
    pub subscription_id: Uuid,
}

/// A job as handed out by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: Uuid,
    pub job: ConfirmationJob,
    /// Number of times the job has been claimed, including the current one.
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}
