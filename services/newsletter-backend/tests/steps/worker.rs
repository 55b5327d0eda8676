use cucumber::{given, then, when};
use speculoos::prelude::*;
use wiremock::{
    matchers::{method, path},
    Mock, ResponseTemplate,
};

use newsletter::domain::ports::secondary::SubscriptionStorage;

use crate::state::TestWorld;

#[given("the email service accepts emails")]
async fn email_service_accepts(world: &mut TestWorld) {
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .named("Confirmation email")
        .mount(&world.app.email_server)
        .await;
}

#[given("the email service is down")]
async fn email_service_down(world: &mut TestWorld) {
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .named("Failing email service")
        .mount(&world.app.email_server)
        .await;
}

#[given(regex = r#"^"(\S+)" is deleted from storage$"#)]
async fn subscription_deleted(world: &mut TestWorld, email: String) {
    let subscriptions = world.app.storage.subscriptions().await;
    let subscription = subscriptions
        .iter()
        .find(|subscription| subscription.email.as_ref() == email)
        .expect("subscription");
    let deleted = world
        .app
        .storage
        .delete_subscription(&subscription.id)
        .await
        .expect("deleting subscription");
    assert_that(&deleted).is_true();
}

#[when(regex = r#"^the confirmation worker runs (\d+) times?$"#)]
async fn worker_runs(world: &mut TestWorld, times: usize) {
    for _ in 0..times {
        world
            .app
            .worker
            .process_next()
            .await
            .expect("processing confirmation job");
    }
}

#[then(regex = r#"^"(\S+)" receives (\d+) confirmation emails?$"#)]
async fn receives_emails(world: &mut TestWorld, email: String, count: usize) {
    let requests = world
        .app
        .email_server
        .received_requests()
        .await
        .expect("get email server received requests");
    let received = requests
        .iter()
        .filter_map(|request| serde_json::from_slice::<serde_json::Value>(&request.body).ok())
        .filter(|body| body["To"].as_str() == Some(email.as_str()))
        .count();
    assert_that(&received).is_equal_to(count);
}

#[then("no email is sent")]
async fn no_email(world: &mut TestWorld) {
    let requests = world
        .app
        .email_server
        .received_requests()
        .await
        .expect("get email server received requests");
    assert_that(&requests).is_empty();
}
