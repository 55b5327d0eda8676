mod error;
mod listener;
pub mod opts;
pub mod server;

pub use self::error::Error;

use common::err_context::ErrorContextExt;
use common::settings::{
    ApplicationSettings, DatabaseSettings, EmailClientSettings, Executor, NewsletterSettings,
    Settings, WorkerSettings,
};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use self::listener::listen_with_host_port;
use self::server::{AppServer, AppState, DynEmail, DynQueue, DynSubscription};
use crate::jobs::{ConfirmationHandler, Worker};
use crate::services::email::EmailClient;
use crate::services::memory::{InMemoryQueue, InMemoryStorage};
use crate::services::postgres::PostgresStorage;

pub struct Application {
    port: u16,
    server: AppServer,
    worker: Option<Worker>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }
}

#[derive(Default)]
pub struct ApplicationBuilder {
    pub subscription: Option<DynSubscription>,
    pub queue: Option<DynQueue>,
    pub email: Option<DynEmail>,
    pub listener: Option<TcpListener>,
    pub url: Option<String>,
    pub newsletter: Option<NewsletterSettings>,
    pub worker: Option<WorkerSettings>,
}

impl ApplicationBuilder {
    pub async fn new(settings: Settings) -> Result<Self, Error> {
        let Settings {
            application,
            newsletter,
            database,
            email_client,
            worker,
            mode: _,
        } = settings;
        let builder = Self::default()
            .storage(database, &worker)
            .await?
            .email(email_client)?
            .listener(application.clone())?
            .url(application.base_url)
            .newsletter(newsletter)?
            .worker(worker);

        Ok(builder)
    }

    /// Sets both the subscription storage and the job queue, from the configured executor.
    pub async fn storage(
        mut self,
        settings: DatabaseSettings,
        worker: &WorkerSettings,
    ) -> Result<Self, Error> {
        let visibility_timeout = Duration::from_secs(worker.visibility_timeout);
        match settings.executor {
            Executor::Postgres => {
                let storage = Arc::new(
                    PostgresStorage::new(settings)
                        .await
                        .context("Establishing a database connection")?
                        .with_visibility_timeout(visibility_timeout),
                );
                let subscription: DynSubscription = storage.clone();
                let queue: DynQueue = storage;
                self.subscription = Some(subscription);
                self.queue = Some(queue);
            }
            Executor::Memory => {
                tracing::warn!("Using in memory storage, subscriptions will not be persisted");
                self.subscription = Some(Arc::new(InMemoryStorage::default()));
                self.queue = Some(Arc::new(InMemoryQueue::new(visibility_timeout)));
            }
        }
        Ok(self)
    }

    pub fn with_subscription(mut self, subscription: DynSubscription) -> Self {
        self.subscription = Some(subscription);
        self
    }

    pub fn with_queue(mut self, queue: DynQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_email(mut self, email: DynEmail) -> Self {
        self.email = Some(email);
        self
    }

    pub fn email(mut self, settings: EmailClientSettings) -> Result<Self, Error> {
        let email = Arc::new(
            EmailClient::new(settings).context("Establishing an email service connection")?,
        );
        self.email = Some(email);
        Ok(self)
    }

    pub fn listener(mut self, settings: ApplicationSettings) -> Result<Self, Error> {
        let listener = listen_with_host_port(settings.host.as_str(), settings.port).context(
            format!(
                "Could not create listener for {}:{}",
                settings.host, settings.port
            ),
        )?;
        self.listener = Some(listener);
        Ok(self)
    }

    pub fn url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    /// The subscription form is routed on `subscribe_url`, which must be an absolute path.
    pub fn newsletter(mut self, settings: NewsletterSettings) -> Result<Self, Error> {
        if !settings.subscribe_url.starts_with('/') {
            return Err(Error::Configuration {
                context: format!(
                    "The subscription url must start with '/', got '{}'",
                    settings.subscribe_url
                ),
            });
        }
        self.newsletter = Some(settings);
        Ok(self)
    }

    pub fn worker(mut self, settings: WorkerSettings) -> Self {
        self.worker = Some(settings);
        self
    }

    /// Builds a standalone worker, without any http server.
    pub fn build_worker(self) -> Result<Worker, Error> {
        let settings = self.worker.clone().ok_or_else(|| missing("worker settings"))?;
        make_worker(
            self.subscription,
            self.queue,
            self.email,
            self.url,
            &settings,
        )
    }

    pub fn build(self) -> Result<Application, Error> {
        let ApplicationBuilder {
            subscription,
            queue,
            email,
            listener,
            url,
            newsletter,
            worker,
        } = self;
        let listener = listener.ok_or_else(|| missing("listener"))?;
        let newsletter = newsletter.ok_or_else(|| missing("newsletter settings"))?;
        let subscription = subscription.ok_or_else(|| missing("subscription storage"))?;
        let queue = queue.ok_or_else(|| missing("job queue"))?;

        let worker = match worker {
            Some(settings) if settings.enabled => Some(make_worker(
                Some(subscription.clone()),
                Some(queue.clone()),
                email,
                url,
                &settings,
            )?),
            _ => None,
        };

        let state = AppState {
            subscription,
            queue,
            fallback_url: newsletter.fallback_url,
        };
        let server = server::new(listener, state, &newsletter.subscribe_url)
            .context("Could not build application server")?;
        let port = server.local_addr().port();

        Ok(Application {
            port,
            server,
            worker,
        })
    }
}

fn missing(component: &str) -> Error {
    Error::Missing {
        context: format!("No {component} was provided"),
    }
}

fn make_worker(
    subscription: Option<DynSubscription>,
    queue: Option<DynQueue>,
    email: Option<DynEmail>,
    url: Option<String>,
    settings: &WorkerSettings,
) -> Result<Worker, Error> {
    let handler = ConfirmationHandler::new(
        subscription.ok_or_else(|| missing("subscription storage"))?,
        email.ok_or_else(|| missing("email service"))?,
        url.ok_or_else(|| missing("base url"))?,
    );
    Ok(Worker::new(
        queue.ok_or_else(|| missing("job queue"))?,
        handler,
        settings,
    ))
}

impl Application {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serves requests until ctrl-c. The confirmation worker, if any, runs in the background
    /// and stops with the server.
    pub async fn run_until_stopped(self) -> Result<(), Error> {
        let Application {
            port,
            server,
            worker,
        } = self;
        let worker = worker.map(|worker| tokio::spawn(worker.run_until_stopped()));
        tracing::info!(port, "Serving newsletter subscriptions");
        let res = server
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server execution error");
        if let Some(worker) = worker {
            worker.abort();
        }
        res?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
