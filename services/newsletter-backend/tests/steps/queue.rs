use cucumber::then;
use speculoos::prelude::*;

use crate::state::TestWorld;

#[then(regex = r#"^(\d+) confirmation jobs? (?:is|are) queued for "(\S+)"$"#)]
async fn jobs_queued_for(world: &mut TestWorld, count: usize, email: String) {
    let subscriptions = world.app.storage.subscriptions().await;
    let subscription = subscriptions
        .iter()
        .find(|subscription| subscription.email.as_ref() == email)
        .expect("subscription");
    let jobs = world
        .app
        .queue
        .enqueued()
        .await
        .into_iter()
        .filter(|job| job.subscription_id == subscription.id)
        .count();
    assert_that(&jobs).is_equal_to(count);
    assert_that(&world.app.queue.enqueued().await).has_length(count);
}

#[then("no confirmation job is queued")]
async fn no_job_queued(world: &mut TestWorld) {
    assert_that(&world.app.queue.enqueued().await).is_empty();
}

#[then("the confirmation queue is empty")]
async fn queue_is_empty(world: &mut TestWorld) {
    assert_that(&world.app.queue.pending().await).is_empty();
    assert_that(&world.app.queue.failed().await).is_empty();
}

#[then("the confirmation job is abandoned")]
async fn job_abandoned(world: &mut TestWorld) {
    assert_that(&world.app.queue.pending().await).is_empty();
    assert_that(&world.app.queue.failed().await).has_length(1);
}
