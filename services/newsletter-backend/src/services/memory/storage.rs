use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::ports::secondary::{SubscriptionError, SubscriptionStorage};
use crate::domain::{NewSubscription, Subscription};

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl InMemoryStorage {
    /// All stored subscriptions, in insertion order.
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.lock().await.clone()
    }
}

#[async_trait]
impl SubscriptionStorage for InMemoryStorage {
    async fn exists_by_email(&self, email: &str) -> Result<bool, SubscriptionError> {
        let subscriptions = self.subscriptions.lock().await;
        Ok(subscriptions.iter().any(|s| s.email.as_ref() == email))
    }

    #[tracing::instrument(name = "Storing a new subscription in memory", skip(self))]
    async fn insert(
        &self,
        new_subscription: &NewSubscription,
    ) -> Result<Subscription, SubscriptionError> {
        let mut subscriptions = self.subscriptions.lock().await;
        if subscriptions
            .iter()
            .any(|s| s.email == new_subscription.email)
        {
            return Err(SubscriptionError::Duplicate {
                context: format!("In Memory Storage: {} is already stored", new_subscription.email),
            });
        }
        let subscription = Subscription {
            id: Uuid::new_v4(),
            email: new_subscription.email.clone(),
            created_at: Utc::now(),
        };
        subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription_by_id(
        &self,
        id: &Uuid,
    ) -> Result<Option<Subscription>, SubscriptionError> {
        let subscriptions = self.subscriptions.lock().await;
        Ok(subscriptions.iter().find(|s| &s.id == id).cloned())
    }

    async fn delete_subscription(&self, id: &Uuid) -> Result<bool, SubscriptionError> {
        let mut subscriptions = self.subscriptions.lock().await;
        let before = subscriptions.len();
        subscriptions.retain(|s| &s.id != id);
        Ok(subscriptions.len() < before)
    }
}
