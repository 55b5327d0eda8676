pub mod flash;
pub mod routes;

use axum::routing::{IntoMakeService, Router};
use axum::Server;
use hyper::server::conn::AddrIncoming;
use std::net::TcpListener;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::domain::ports::secondary::{EmailService, JobQueue, SubscriptionStorage};

pub type DynSubscription = Arc<dyn SubscriptionStorage + Send + Sync>;
pub type DynQueue = Arc<dyn JobQueue + Send + Sync>;
pub type DynEmail = Arc<dyn EmailService + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub subscription: DynSubscription,
    pub queue: DynQueue,
    /// Redirection target for requests without a referer.
    pub fallback_url: String,
}

pub type AppServer = Server<AddrIncoming, IntoMakeService<Router>>;

pub fn router(state: AppState, subscribe_url: &str) -> Router {
    Router::new()
        .merge(routes::routes(state, subscribe_url))
        .layer(TraceLayer::new_for_http())
        .layer(CookieManagerLayer::new())
}

pub fn new(
    listener: TcpListener,
    state: AppState,
    subscribe_url: &str,
) -> Result<AppServer, hyper::Error> {
    let router = router(state, subscribe_url);
    let server = Server::from_tcp(listener)?.serve(router.into_make_service());
    Ok(server)
}
