use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::SubscriberEmail;

/// A stored newsletter subscription. `id` and `created_at` are assigned by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub created_at: DateTime<Utc>,
}
