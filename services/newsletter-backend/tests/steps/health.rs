use cucumber::{then, when};
use reqwest::StatusCode;
use speculoos::prelude::*;

use crate::state::TestWorld;

#[when("the user requests a health check")]
async fn health_check(world: &mut TestWorld) {
    world.health = Some(world.app.get_health().await);
}

#[then("the service is healthy")]
async fn service_is_healthy(world: &mut TestWorld) {
    let resp = world.health.take().expect("health response");
    assert_that(&resp.status()).is_equal_to(StatusCode::OK);
    let body: serde_json::Value = resp.json().await.expect("health body");
    assert_that(&body["status"].as_str()).is_equal_to(Some("OK"));
}
