use cucumber::World;
use reqwest::{header, StatusCode};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time;
use tokio::task::JoinHandle;
use tower_cookies::Cookie;
use wiremock::MockServer;

use common::settings::Settings;
use newsletter::application::opts::{Command, Opts};
use newsletter::application::server::flash::{Flash, FLASH_COOKIE};
use newsletter::application::{Application, Error};
use newsletter::jobs::Worker;
use newsletter::services::memory::{InMemoryQueue, InMemoryStorage};

/// The TestWorld contains both the context for every tests
/// and information that needs to be kept between steps of a
/// scenario. Cucumber builds one per scenario, so each scenario
/// gets its own server, with empty storage and queue.
#[derive(World, Debug)]
#[world(init = Self::new)]
pub struct TestWorld {
    pub app: TestApp,
    // The response to the last form submission, set in a 'when' step and
    // checked in the following 'then' steps.
    pub resp: Option<FormResponse>,
    pub health: Option<reqwest::Response>,
}

impl TestWorld {
    /// Creates a new TestWorld, using a 'testing' configuration.
    pub async fn new() -> Self {
        let app = spawn_app().await;

        TestWorld {
            app,
            resp: None,
            health: None,
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub subscribe_url: String,
    pub storage: Arc<InMemoryStorage>,
    pub queue: Arc<InMemoryQueue>,
    // A Mock Server, so we don't have to use a real email server.
    pub email_server: MockServer,
    // A worker sharing the server's storage and queue, run on demand by the steps.
    pub worker: Worker,
    // The API to access the server. It does not follow redirections.
    pub api_client: reqwest::Client,
    // The server handle, so that it can be killed.
    pub server_handle: Option<JoinHandle<Result<(), Error>>>,
}

impl fmt::Debug for TestApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestApp")
            .field("address", &self.address)
            .field("port", &self.port)
            .finish()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

/// What the browser gets back after submitting the form.
#[derive(Debug, Clone)]
pub struct FormResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub flash: Option<Flash>,
}

pub async fn spawn_app() -> TestApp {
    // We are not using a real Email server, so we spawn a wiremock server,
    // and then use this server's url in our configuration.
    let email_server = MockServer::start().await;

    // This syntax is what would be used on the command line to override the
    // email service's url.
    let override_email_server_url = format!("email_client.server_url='{}'", email_server.uri());

    let opts = Opts {
        config_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config"),
        run_mode: Some("testing".to_string()),
        settings: vec![override_email_server_url],
        cmd: Command::Run,
    };

    let settings: Settings = opts.try_into().expect("settings");

    // The storage and queue are shared with the test, so that steps can
    // inspect what the server did.
    let storage = Arc::new(InMemoryStorage::default());
    let queue = Arc::new(InMemoryQueue::default());

    let app = Application::builder()
        .with_subscription(storage.clone())
        .with_queue(queue.clone())
        .email(settings.email_client.clone())
        .expect("getting email client")
        .listener(settings.application.clone())
        .expect("getting listener")
        .url(settings.application.base_url.clone())
        .newsletter(settings.newsletter.clone())
        .expect("newsletter settings")
        .worker(settings.worker.clone())
        .build()
        .expect("application");

    let worker = Application::builder()
        .with_subscription(storage.clone())
        .with_queue(queue.clone())
        .email(settings.email_client.clone())
        .expect("getting email client")
        .url(settings.application.base_url.clone())
        .worker(settings.worker.clone())
        .build_worker()
        .expect("worker");

    let port = app.port();
    let address = format!("http://{}:{}", settings.application.host, port);
    let handle = tokio::spawn(app.run_until_stopped());

    let api_client = reqwest::Client::builder()
        .timeout(time::Duration::from_secs(2))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("api client build");

    TestApp {
        address,
        port,
        subscribe_url: settings.newsletter.subscribe_url,
        storage,
        queue,
        email_server,
        worker,
        api_client,
        server_handle: Some(handle),
    }
}

impl TestApp {
    /// Submits the subscription form, as a browser would from the `referer` page.
    pub async fn post_subscription(
        &self,
        email: Option<&str>,
        referer: Option<&str>,
    ) -> FormResponse {
        let url = format!("{}{}", self.address, self.subscribe_url);
        let form: Vec<(&str, &str)> = email.map(|email| ("email", email)).into_iter().collect();
        let mut request = self.api_client.post(url).form(&form);
        if let Some(referer) = referer {
            request = request.header(header::REFERER, referer);
        }
        let resp = request
            .send()
            .await
            .expect("failed to post on subscriptions endpoint");

        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let flash = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value.to_string()).ok())
            .find(|cookie| cookie.name() == FLASH_COOKIE)
            .map(|cookie| Flash::decode(cookie.value()).expect("flash"));

        FormResponse {
            status: resp.status(),
            location,
            flash,
        }
    }

    pub async fn get_health(&self) -> reqwest::Response {
        let url = format!("{}/health", self.address);
        self.api_client
            .get(url)
            .send()
            .await
            .expect("failed to get health")
    }
}
