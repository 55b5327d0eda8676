use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap};
use axum::response::Redirect;
use common::err_context::ErrorContextExt;
use tower_cookies::Cookies;
use uuid::Uuid;

use super::Error;
use crate::application::server::flash::{set_flash, Flash};
use crate::application::server::AppState;
use crate::domain::{subscribe, NewSubscription, SubscriptionRequest};

/// POST handler for newsletter subscriptions, sent by an html form.
///
/// The response is always a redirection back to the page holding the form, with a flash
/// cookie telling how it went:
/// - invalid email => field errors under `email`, and nothing is stored.
/// - valid email => the same message, whether the email was already subscribed or not.
///
/// A body sent with a content type other than an url encoded form is refused with
/// `415 Unsupported Media Type`, before anything is stored or flashed. A missing or
/// unreadable form is handled as a form without email.
#[tracing::instrument(
    name = "Newsletter subscription",
    skip(state, cookies, headers, request),
    fields(
        request_id = %Uuid::new_v4(),
    )
)]
pub async fn subscriptions(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    request: Result<Form<SubscriptionRequest>, FormRejection>,
) -> Result<Redirect, Error> {
    let request = match request {
        Ok(Form(request)) => request,
        Err(FormRejection::InvalidFormContentType(_))
            if headers.contains_key(header::CONTENT_TYPE) =>
        {
            return Err(Error::UnsupportedMediaType {
                context: "Subscriptions are sent as url encoded forms".to_string(),
            });
        }
        Err(rejection) => {
            tracing::info!("Unreadable subscription form: {rejection}");
            SubscriptionRequest::default()
        }
    };
    let back = referer(&headers).unwrap_or_else(|| state.fallback_url.clone());

    let subscription = match NewSubscription::try_from(request) {
        Ok(subscription) => subscription,
        Err(errors) => {
            tracing::info!("Invalid subscription request: {errors}");
            set_flash(&cookies, &Flash::errors(errors))
                .context("Could not report invalid subscription")?;
            return Ok(Redirect::to(&back));
        }
    };

    let email = subscription.email.to_string();
    subscribe(state.subscription.as_ref(), state.queue.as_ref(), subscription)
        .await
        .context("Could not register subscription")?;

    set_flash(
        &cookies,
        &Flash::message(format!("You will receive the latest news at {email}")),
    )
    .context("Could not report subscription")?;

    Ok(Redirect::to(&back))
}

fn referer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}
