pub mod email_service;
pub mod job_queue;
pub mod subscription_storage;

pub use email_service::{Email, EmailService, Error as EmailError};
pub use job_queue::{Error as QueueError, JobQueue};
pub use subscription_storage::{Error as SubscriptionError, SubscriptionStorage};

#[cfg(test)]
pub use email_service::MockEmailService;

#[cfg(test)]
pub use job_queue::MockJobQueue;

#[cfg(test)]
pub use subscription_storage::MockSubscriptionStorage;
