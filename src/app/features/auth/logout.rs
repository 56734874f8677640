use axum::{response::Redirect, routing::post, Router};
use axum_extra::extract::cookie::SignedCookieJar;

use crate::app::{identity, redirect, session, AppState};

/// POST /logout — Destroy the session cookie.
pub async fn submit(jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    let current = session::get_session(&jar);
    if let Ok(Some(user_id)) = identity::get_user_id(&current) {
        tracing::info!(user_id = %user_id, "user logged out");
    }

    (session::destroy_session(jar), Redirect::to(redirect::LOGIN_PATH))
}

/// Logout routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/logout", post(submit))
}
