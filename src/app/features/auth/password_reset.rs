use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::SignedCookieJar;
use rand_core::RngCore;
use serde::Deserialize;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use validator::Validate;

use crate::app::{
    db,
    domain::{Email, HashedPassword, OrganizationId, Password, UserId, Username},
    error::AppError,
    mail::{self, EmailMessage},
    redirect, session, AppState, APP_NAME,
};

/// Forgot password form data from HTTP request.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordForm {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
}

#[derive(Template)]
#[template(path = "forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub app_name: &'static str,
    pub error: String,
    pub success: bool,
}

/// Reset password form data from HTTP request.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordForm {
    pub token: String,

    #[validate(length(min = 10, max = 128))]
    pub password: String,

    #[validate(must_match(other = "password"))]
    pub confirm_password: String,
}

#[derive(Template)]
#[template(path = "reset_password.html")]
pub struct ResetPasswordTemplate {
    pub app_name: &'static str,
    pub error: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
}

/// Generate a high-entropy reset token (64 hex chars = 32 bytes).
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand_core::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn render_forgot(error: &str, success: bool) -> Response {
    let template = ForgotPasswordTemplate {
        app_name: APP_NAME,
        error: error.to_string(),
        success,
    };
    Html(template.render().unwrap_or_else(|_| "Template error".to_string())).into_response()
}

fn render_reset(error: &str, token: &str) -> Response {
    let template = ResetPasswordTemplate {
        app_name: APP_NAME,
        error: error.to_string(),
        token: token.to_string(),
    };
    Html(template.render().unwrap_or_else(|_| "Template error".to_string())).into_response()
}

/// Base URL for the reset link: the host of the user's default organization,
/// else of their first organization, else the app URL.
async fn link_base_for(state: &AppState, user_id: &UserId) -> Result<String, AppError> {
    let memberships = db::memberships::list_for_user(&state.db, user_id)
        .await
        .map_err(AppError::Database)?;

    let chosen = memberships
        .iter()
        .find(|m| m.is_default)
        .or_else(|| memberships.first())
        .and_then(|m| OrganizationId::from_string(&m.organization_id).ok());

    let organization = match chosen {
        Some(id) => db::organizations::find_by_id(&state.db, &id)
            .await
            .map_err(AppError::Database)?,
        None => None,
    };

    Ok(match organization {
        Some(org) => org.base_url(state.config.app_url_base()),
        None => state.config.app_url_base().to_string(),
    })
}

/// Issue a token and email the link, if the user exists and has a contact email.
async fn send_reset_link(state: &AppState, username: &Username) -> Result<(), AppError> {
    let Some(user) = db::users::find_by_username(&state.db, username)
        .await
        .map_err(AppError::Database)?
    else {
        return Ok(());
    };
    let user_id = UserId::from_string(&user.id).map_err(|_| AppError::Internal)?;

    let contact = db::contacts::find_by_user(&state.db, &user_id)
        .await
        .map_err(AppError::Database)?;
    let Some(to) = contact.and_then(|c| c.email).and_then(|e| Email::new(e).ok()) else {
        tracing::info!(user_id = %user_id, "password reset requested for user without contact email");
        return Ok(());
    };

    let token = generate_token();
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
    db::password_reset::insert_token(&state.db, &user_id, &token, expires_at)
        .await
        .map_err(AppError::Database)?;

    let link = format!("{}/reset-password?token={}", link_base_for(state, &user_id).await?, token);
    let message = EmailMessage::new(
        to,
        format!("Reset your {} password", APP_NAME),
        format!("Use this link within the hour to choose a new password: {}", link),
        state.config.mail_from.clone(),
    );
    mail::deliver(state.mail.as_ref(), &message).await;
    Ok(())
}

/// GET /forgot-password
pub async fn show_forgot() -> Response {
    render_forgot("", false)
}

/// POST /forgot-password — Same answer whether or not the user exists.
pub async fn submit_forgot(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    if form.validate().is_err() {
        return render_forgot("Enter your username.", false);
    }

    if let Ok(username) = Username::new(form.username) {
        if let Err(err) = send_reset_link(&state, &username).await {
            tracing::error!(?err, "password reset request failed");
        }
    }

    render_forgot("", true)
}

/// GET /reset-password?token=...
pub async fn show_reset(Query(query): Query<ResetQuery>) -> Response {
    match query.token {
        Some(token) if !token.is_empty() => render_reset("", &token),
        _ => render_reset("This reset link is invalid.", ""),
    }
}

async fn apply_reset(pool: &SqlitePool, token: &str, password: &Password) -> Result<bool, AppError> {
    let password_hash = HashedPassword::from_password(password).map_err(|_| AppError::Internal)?;

    let mut tx = pool.begin().await.map_err(AppError::Database)?;
    let Some(record) = db::password_reset::find_valid(&mut *tx, token)
        .await
        .map_err(AppError::Database)?
    else {
        return Ok(false);
    };
    let user_id = UserId::from_string(&record.user_id).map_err(|_| AppError::Internal)?;

    if !db::password_reset::mark_used(&mut *tx, token)
        .await
        .map_err(AppError::Database)?
    {
        return Ok(false);
    }
    db::users::update_password(&mut *tx, &user_id, &password_hash)
        .await
        .map_err(AppError::Database)?;
    tx.commit().await.map_err(AppError::Database)?;

    tracing::info!(user_id = %user_id, "password reset");
    Ok(true)
}

/// POST /reset-password — Consume the token and set the password. The bumped
/// session generation ends every session issued before, this browser's included.
pub async fn submit_reset(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    if form.validate().is_err() {
        return Ok(render_reset("Passwords must match and be 10–128 characters.", &form.token));
    }

    let password = match Password::new(form.password) {
        Ok(p) => p,
        Err(e) => {
            let msg = e
                .message
                .map(|m| m.into_owned())
                .unwrap_or_else(|| "Invalid password.".to_string());
            return Ok(render_reset(&msg, &form.token));
        }
    };

    if !apply_reset(&state.db, &form.token, &password).await? {
        return Ok(render_reset("This reset link is invalid or has expired.", ""));
    }

    Ok((session::destroy_session(jar), Redirect::to(redirect::LOGIN_PATH)).into_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", get(show_forgot).post(submit_forgot))
        .route("/reset-password", get(show_reset).post(submit_reset))
}
