use axum::{
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use sqlx::Error as SqlxError;

use crate::app::{redirect, session};

/// Shown on the login page after a user with no organizations is signed out.
pub const NO_ORGANIZATION_MESSAGE: &str =
    "Your account is not a member of any organization. Ask an administrator to add you.";

/// Application error type for unified error handling across the app.
///
/// The session-scoping variants are resolved here, in one place: handlers and
/// extractors return them with `?` and this `IntoResponse` turns them into the
/// matching redirect, clearing the session cookie for forced logouts.
#[derive(Debug)]
pub enum AppError {
    /// Validation errors (400 Bad Request) - invalid input data
    Validation(String),

    /// Authentication errors (400 Bad Request) - wrong credentials, etc.
    Auth(String),

    /// No user id in the session. Redirects to login, then back to `redirect_to`.
    Unauthenticated { redirect_to: String },

    /// Session names a user that does not exist. Forced logout.
    SessionInconsistent,

    /// Authenticated user has no memberships at all. Forced logout.
    NoOrganization,

    /// Memberships exist but none is active in the session. Redirects to the chooser.
    OrgNotSelected { redirect_to: String },

    /// Submitted organization is not one of the user's memberships.
    InvalidOrgSelection,

    /// Role check failed (403).
    Forbidden,

    /// Resource does not exist or is outside the active organization (404).
    NotFound(String),

    /// Database errors (500 Internal Server Error)
    Database(SqlxError),

    /// Generic internal errors (500 Internal Server Error)
    Internal,
}

impl AppError {
    /// True for the variants that destroy the session before redirecting.
    pub fn is_forced_logout(&self) -> bool {
        matches!(self, AppError::SessionInconsistent | AppError::NoOrganization)
    }
}

fn forced_logout(location: &str) -> Response {
    let clear = session::clear_session_cookie().to_string();
    (AppendHeaders([(SET_COOKIE, clear)]), Redirect::to(location)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthenticated { redirect_to } => {
                return Redirect::to(&redirect::login_url(&redirect_to)).into_response();
            }
            AppError::OrgNotSelected { redirect_to } => {
                return Redirect::to(&redirect::choose_org_url(&redirect_to)).into_response();
            }
            AppError::SessionInconsistent => {
                tracing::warn!("session references a missing user, forcing logout");
                return forced_logout(redirect::LOGIN_PATH);
            }
            AppError::NoOrganization => {
                tracing::warn!("user has no organization memberships, forcing logout");
                let location = format!(
                    "{}?error={}",
                    redirect::LOGIN_PATH,
                    urlencoding::encode(NO_ORGANIZATION_MESSAGE)
                );
                return forced_logout(&location);
            }
            AppError::InvalidOrgSelection => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid organization selection".to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Access denied".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(err) => {
                tracing::error!(%err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
