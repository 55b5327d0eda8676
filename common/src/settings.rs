use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::{
    deserialize_bool_from_anything, deserialize_number_from_string,
};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    /// Public URL of the site, used in outgoing emails.
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterSettings {
    /// Path on which the subscription form is posted.
    pub subscribe_url: String,
    /// Where to redirect when the request carries no referer.
    pub fallback_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Executor {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(deserialize_with = "deserialize_bool_from_anything")]
    pub require_ssl: bool,
    /// Pool acquire timeout, in milliseconds.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub connection_timeout: u64,
    pub executor: Executor,
    pub table_name: String,
    pub jobs_table_name: String,
}

impl DatabaseSettings {
    /// Connection string, without the password.
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}@{}:{}/{}",
            self.username, self.host, self.port, self.database_name
        )
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            // Try an encrypted connection, fallback
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database_name)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClientSettings {
    /// URL of the Email Service the client connects to.
    pub server_url: String,
    pub sender_email: String,
    pub authorization_token: String,
    /// Request timeout, in seconds.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Run the confirmation worker alongside the http server.
    #[serde(deserialize_with = "deserialize_bool_from_anything")]
    pub enabled: bool,
    /// Pause when the queue is empty, in milliseconds.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_attempts: i32,
    /// Delay before a failed job is retried, in seconds.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_delay: u64,
    /// How long a claimed job stays invisible to other workers, in seconds.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub visibility_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub newsletter: NewsletterSettings,
    pub database: DatabaseSettings,
    pub email_client: EmailClientSettings,
    pub worker: WorkerSettings,
    pub mode: String,
}
