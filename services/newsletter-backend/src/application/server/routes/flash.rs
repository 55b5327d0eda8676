use axum::extract::Json;
use tower_cookies::Cookies;

use crate::application::server::flash::{take_flash, Flash};

/// GET handler returning the pending flash, and clearing it.
///
/// Without a pending flash, the response is an empty flash. An unreadable cookie
/// is cleared, and reported as an empty flash as well.
pub async fn read_flash(cookies: Cookies) -> Json<Flash> {
    let flash = match take_flash(&cookies) {
        Ok(flash) => flash.unwrap_or_default(),
        Err(err) => {
            tracing::warn!("Discarding flash cookie: {err}");
            Flash::default()
        }
    };
    Json(flash)
}
