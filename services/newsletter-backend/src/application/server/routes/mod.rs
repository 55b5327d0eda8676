mod error;
pub mod flash;
pub mod health;
pub mod subscriptions;

use super::AppState;
use axum::routing::{get, post, Router};

pub use self::error::Error;
use self::{flash::read_flash, health::health, subscriptions::subscriptions};

pub fn routes(state: AppState, subscribe_url: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/flash", get(read_flash))
        .route(subscribe_url, post(subscriptions))
        .with_state(state)
}
