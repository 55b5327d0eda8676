use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::err_context::ErrorContextExt;
use uuid::Uuid;

use super::PostgresStorage;
use crate::domain::{
    ports::secondary::SubscriptionError, ports::secondary::SubscriptionStorage, NewSubscription,
    SubscriberEmail, Subscription,
};

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = SubscriptionError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let email =
            SubscriberEmail::parse(row.email).map_err(|err| SubscriptionError::Validation {
                context: format!("Invalid email stored in the database: {err}"),
            })?;
        Ok(Subscription {
            id: row.id,
            email,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl SubscriptionStorage for PostgresStorage {
    #[tracing::instrument(name = "Checking a subscription exists in postgres", skip(self))]
    async fn exists_by_email(&self, email: &str) -> Result<bool, SubscriptionError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE email = $1)",
            self.subscriptions_table
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context(format!("Could not look up subscription for {email}"))?;
        Ok(exists)
    }

    #[tracing::instrument(name = "Storing a new subscription in postgres", skip(self))]
    async fn insert(
        &self,
        new_subscription: &NewSubscription,
    ) -> Result<Subscription, SubscriptionError> {
        let sql = format!(
            "INSERT INTO {} (id, email, created_at) VALUES ($1, $2, $3) RETURNING id, email, created_at",
            self.subscriptions_table
        );
        let row: SubscriptionRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(new_subscription.email.as_ref())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .context(format!(
                "Could not store new subscription for {}",
                new_subscription.email
            ))?;
        row.try_into()
    }

    #[tracing::instrument(name = "Fetching a subscription by id in postgres", skip(self))]
    async fn get_subscription_by_id(
        &self,
        id: &Uuid,
    ) -> Result<Option<Subscription>, SubscriptionError> {
        let sql = format!(
            "SELECT id, email, created_at FROM {} WHERE id = $1",
            self.subscriptions_table
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Could not get subscription for {id}"))?;
        row.map(Subscription::try_from).transpose()
    }

    #[tracing::instrument(name = "Deleting a subscription in postgres", skip(self))]
    async fn delete_subscription(&self, id: &Uuid) -> Result<bool, SubscriptionError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.subscriptions_table);
        let res = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .context(format!("Could not delete subscription {id}"))?;
        Ok(res.rows_affected() > 0)
    }
}
