use cucumber::{given, then, when};
use reqwest::StatusCode;
use speculoos::prelude::*;

use crate::state::TestWorld;

#[given(regex = r#"^"(\S+)" is already subscribed$"#)]
async fn already_subscribed(world: &mut TestWorld, email: String) {
    let resp = world
        .app
        .post_subscription(Some(&email), Some("http://127.0.0.1/"))
        .await;
    assert_that(&resp.status).is_equal_to(StatusCode::SEE_OTHER);
}

#[given("nobody has subscribed yet")]
async fn nobody_subscribed(world: &mut TestWorld) {
    assert_that(&world.app.storage.subscriptions().await).is_empty();
    assert_that(&world.app.queue.enqueued().await).is_empty();
    assert_that(&world.resp.is_none()).is_true();
}

#[when(regex = r#"^a visitor on "(\S+)" subscribes with email "(\S+)"$"#)]
async fn subscribes(world: &mut TestWorld, referer: String, email: String) {
    let resp = world
        .app
        .post_subscription(Some(&email), Some(&referer))
        .await;
    world.resp = Some(resp);
}

#[when(regex = r#"^a visitor on "(\S+)" submits the form without email$"#)]
async fn subscribes_without_email(world: &mut TestWorld, referer: String) {
    let resp = world.app.post_subscription(None, Some(&referer)).await;
    world.resp = Some(resp);
}

#[when(regex = r#"^a visitor without referer subscribes with email "(\S+)"$"#)]
async fn subscribes_without_referer(world: &mut TestWorld, email: String) {
    let resp = world.app.post_subscription(Some(&email), None).await;
    world.resp = Some(resp);
}

#[then(regex = r#"^the visitor is redirected to "(\S+)"$"#)]
fn redirected(world: &mut TestWorld, location: String) {
    let resp = world.resp.as_ref().expect("response");
    assert_that(&resp.status).is_equal_to(StatusCode::SEE_OTHER);
    assert_that(&resp.location).is_equal_to(Some(location));
}

#[then(regex = r#"^the flash says "(.+)"$"#)]
fn flash_says(world: &mut TestWorld, message: String) {
    let flash = world
        .resp
        .as_ref()
        .and_then(|resp| resp.flash.as_ref())
        .expect("flash");
    assert_that(&flash.flash).is_equal_to(Some(message));
    assert_that(&flash.errors.is_empty()).is_true();
}

#[then(regex = r#"^the flash reports "(.+)" for "(\S+)"$"#)]
fn flash_reports(world: &mut TestWorld, message: String, field: String) {
    let flash = world
        .resp
        .as_ref()
        .and_then(|resp| resp.flash.as_ref())
        .expect("flash");
    assert_that(&flash.flash).is_none();
    assert_that(&flash.errors.get(&field)).is_equal_to(Some(&vec![message]));
}

#[then(regex = r#"^the storage holds (\d+) subscriptions? for "(\S+)"$"#)]
async fn storage_holds(world: &mut TestWorld, count: usize, email: String) {
    let subscriptions = world.app.storage.subscriptions().await;
    let matching = subscriptions
        .iter()
        .filter(|subscription| subscription.email.as_ref() == email)
        .count();
    assert_that(&matching).is_equal_to(count);
}

#[then("the storage is empty")]
async fn storage_is_empty(world: &mut TestWorld) {
    assert_that(&world.app.storage.subscriptions().await).is_empty();
}
