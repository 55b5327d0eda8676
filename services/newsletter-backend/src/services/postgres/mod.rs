/// Implementation of the subscription storage and the job queue using postgres
mod error;
mod queue;
mod subscription;

pub use self::error::Error;

use common::err_context::ErrorContextExt;
use common::settings::DatabaseSettings;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pub pool: PgPool,
    pub config: DatabaseSettings,
    subscriptions_table: String,
    jobs_table: String,
    visibility_timeout: Duration,
}

impl PostgresStorage {
    /// Connects to the database, and makes sure both tables exist.
    pub async fn new(config: DatabaseSettings) -> Result<PostgresStorage, Error> {
        let subscriptions_table = table_name(&config.table_name)?;
        let jobs_table = table_name(&config.jobs_table_name)?;
        let pool = connect_with_options(&config).await?;
        tracing::debug!("Connected Postgres Pool to {}", config.connection_string());
        let storage = PostgresStorage {
            pool,
            config,
            subscriptions_table,
            jobs_table,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// How long a claimed job stays hidden from other workers.
    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    #[tracing::instrument(name = "Initializing postgres schema", skip(self))]
    pub async fn init_schema(&self) -> Result<(), Error> {
        let statements = [
            format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE,
                    created_at TIMESTAMPTZ NOT NULL
                )"#,
                self.subscriptions_table
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    subscription_id UUID NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending',
                    attempts INT NOT NULL DEFAULT 0,
                    run_at TIMESTAMPTZ NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    last_error TEXT
                )"#,
                self.jobs_table
            ),
            format!(
                r#"CREATE INDEX IF NOT EXISTS {}_due_idx ON {} (status, run_at)"#,
                self.jobs_table.replace('.', "_"),
                self.jobs_table
            ),
        ];
        for sql in statements.iter() {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .context(format!("Unable to execute {sql}"))?;
        }
        tracing::info!(
            subscriptions = %self.subscriptions_table,
            jobs = %self.jobs_table,
            "Postgres schema initialized"
        );
        Ok(())
    }
}

pub async fn connect_with_options(config: &DatabaseSettings) -> Result<PgPool, Error> {
    let options = config.connect_options();
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(config.connection_timeout))
        .connect_with(options)
        .await
        .context(format!(
            "Could not establish connection to {} with timeout {}",
            config.connection_string(),
            config.connection_timeout
        ))?;

    Ok(pool)
}

/// Table names end up in SQL text, so only plain (optionally schema qualified)
/// identifiers are accepted.
fn table_name(name: &str) -> Result<String, Error> {
    let valid_identifier = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() <= 2 && parts.iter().all(|part| valid_identifier(part)) {
        Ok(name.to_string())
    } else {
        Err(Error::Configuration {
            context: format!("Invalid table name '{name}'"),
        })
    }
}
