pub mod confirmation_job;
pub mod new_subscription;
pub mod ports;
pub mod subscribe;
pub mod subscriber_email;
pub mod subscription;

pub use confirmation_job::{ConfirmationJob, QueuedJob};
pub use new_subscription::{NewSubscription, SubscriptionRequest, ValidationErrors};
pub use subscribe::{subscribe, Error as SubscribeError, SubscribeOutcome};
pub use subscriber_email::SubscriberEmail;
pub use subscription::Subscription;
