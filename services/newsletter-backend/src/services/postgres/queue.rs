use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::err_context::ErrorContextExt;
use std::time::Duration;
use uuid::Uuid;

use super::PostgresStorage;
use crate::domain::ports::secondary::{JobQueue, QueueError};
use crate::domain::{ConfirmationJob, QueuedJob};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    subscription_id: Uuid,
    attempts: i32,
    created_at: DateTime<Utc>,
}

impl From<JobRow> for QueuedJob {
    fn from(row: JobRow) -> Self {
        QueuedJob {
            id: row.id,
            job: ConfirmationJob {
                subscription_id: row.subscription_id,
            },
            attempts: row.attempts,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl JobQueue for PostgresStorage {
    #[tracing::instrument(name = "Enqueuing a confirmation job in postgres", skip(self))]
    async fn enqueue(&self, job: ConfirmationJob) -> Result<QueuedJob, QueueError> {
        let sql = format!(
            r#"INSERT INTO {} (id, subscription_id, status, attempts, run_at, created_at)
               VALUES ($1, $2, 'pending', 0, now(), now())
               RETURNING id, subscription_id, attempts, created_at"#,
            self.jobs_table
        );
        let row: JobRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(job.subscription_id)
            .fetch_one(&self.pool)
            .await
            .context(format!(
                "Could not enqueue confirmation for subscription {}",
                job.subscription_id
            ))?;
        Ok(row.into())
    }

    // Skipping locked rows lets several workers poll the same table.
    #[tracing::instrument(name = "Claiming a confirmation job in postgres", skip(self))]
    async fn next(&self) -> Result<Option<QueuedJob>, QueueError> {
        let sql = format!(
            r#"UPDATE {table}
               SET status = 'running',
                   attempts = attempts + 1,
                   run_at = now() + make_interval(secs => $1)
               WHERE id = (
                   SELECT id FROM {table}
                   WHERE status <> 'failed' AND run_at <= now()
                   ORDER BY created_at
                   LIMIT 1
                   FOR UPDATE SKIP LOCKED
               )
               RETURNING id, subscription_id, attempts, created_at"#,
            table = self.jobs_table
        );
        let row: Option<JobRow> = sqlx::query_as(&sql)
            .bind(self.visibility_timeout.as_secs_f64())
            .fetch_optional(&self.pool)
            .await
            .context("Could not claim a confirmation job")?;
        Ok(row.map(QueuedJob::from))
    }

    #[tracing::instrument(name = "Completing a confirmation job in postgres", skip(self))]
    async fn complete(&self, id: &Uuid) -> Result<(), QueueError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.jobs_table);
        let res = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .context(format!("Could not complete job {id}"))?;
        if res.rows_affected() == 0 {
            return Err(QueueError::Missing {
                context: format!("PostgreSQL Queue: cannot complete job {id}"),
            });
        }
        Ok(())
    }

    #[tracing::instrument(name = "Failing a confirmation job in postgres", skip(self))]
    async fn fail(
        &self,
        id: &Uuid,
        reason: &str,
        retry_in: Option<Duration>,
    ) -> Result<(), QueueError> {
        let res = match retry_in {
            Some(delay) => {
                let sql = format!(
                    r#"UPDATE {} SET status = 'pending', last_error = $2,
                       run_at = now() + make_interval(secs => $3)
                       WHERE id = $1"#,
                    self.jobs_table
                );
                sqlx::query(&sql)
                    .bind(id)
                    .bind(reason)
                    .bind(delay.as_secs_f64())
                    .execute(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    "UPDATE {} SET status = 'failed', last_error = $2 WHERE id = $1",
                    self.jobs_table
                );
                sqlx::query(&sql)
                    .bind(id)
                    .bind(reason)
                    .execute(&self.pool)
                    .await
            }
        }
        .context(format!("Could not record failure of job {id}"))?;
        if res.rows_affected() == 0 {
            return Err(QueueError::Missing {
                context: format!("PostgreSQL Queue: cannot fail job {id}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;
    use crate::services::postgres::tests::testing_storage;

    #[tokio::test]
    #[ignore = "requires a running postgres database"]
    async fn queue_should_hand_out_and_complete_jobs() {
        let queue = testing_storage().await;
        let job = ConfirmationJob {
            subscription_id: Uuid::new_v4(),
        };

        let queued = queue.enqueue(job).await.expect("enqueue");
        let claimed = queue.next().await.expect("next").expect("a job");

        assert_that(&claimed.id).is_equal_to(queued.id);
        assert_that(&claimed.job).is_equal_to(job);
        assert_that(&claimed.attempts).is_equal_to(1);
        assert_that(&queue.next().await.expect("next")).is_none();

        queue.complete(&claimed.id).await.expect("complete");
        assert!(matches!(
            queue.complete(&claimed.id).await,
            Err(QueueError::Missing { .. })
        ));
    }

    #[tokio::test]
    #[ignore = "requires a running postgres database"]
    async fn queue_should_retry_then_dead_letter_failed_jobs() {
        let queue = testing_storage().await;
        queue
            .enqueue(ConfirmationJob {
                subscription_id: Uuid::new_v4(),
            })
            .await
            .expect("enqueue");

        let claimed = queue.next().await.expect("next").expect("a job");
        queue
            .fail(&claimed.id, "email service down", Some(Duration::ZERO))
            .await
            .expect("fail");
        let claimed = queue.next().await.expect("next").expect("a job");
        assert_that(&claimed.attempts).is_equal_to(2);

        queue
            .fail(&claimed.id, "email service down", None)
            .await
            .expect("fail");
        assert_that(&queue.next().await.expect("next")).is_none();
    }
}
