use std::sync::Arc;

use axum::{extract::FromRef, Router};
use axum_extra::extract::cookie::Key;
use sqlx::SqlitePool;

/// Human-readable application name, used in templates and emails.
pub const APP_NAME: &str = "Fundbook";

/// Shared state available to all handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub mail: Arc<dyn mail::EmailSender>,
    pub config: config::Config,
    /// Signs the session cookie.
    pub cookie_key: Key,
}

impl AppState {
    /// Assemble state, deriving the cookie key from `config.session_secret`.
    pub fn new(
        db: SqlitePool,
        mail: Arc<dyn mail::EmailSender>,
        config: config::Config,
    ) -> Result<Self, String> {
        let cookie_key = session::key_from_secret(&config.session_secret)?;
        Ok(Self {
            db,
            mail,
            config,
            cookie_key,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(features::auth::routes())
        .merge(features::choose_org::routes())
        .merge(features::dashboard::routes())
        .merge(features::accounts::routes())
        .merge(features::organization::routes())
        .merge(features::admin::routes())
}

pub mod authorization;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod features;
pub mod identity;
pub mod mail;
pub mod redirect;
pub mod session;
pub mod tenant;
