use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::app::{
    db,
    domain::{HashedPassword, Password, UserId, Username},
    error::{AppError, NO_ORGANIZATION_MESSAGE},
    redirect,
    session::{self, CommitOptions, Session},
    tenant, AppState, APP_NAME,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Login form data from HTTP request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, max = 64))]
    pub username: String,

    #[validate(length(min = 1))]
    pub password: String,

    /// Checkbox; present when ticked.
    pub remember: Option<String>,

    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
    pub error: Option<String>,
}

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub app_name: &'static str,
    pub error: String,
    pub username: String,
    pub redirect_to: String,
}

fn render(error: &str, username: &str, redirect_to: &str) -> Response {
    let template = LoginTemplate {
        app_name: APP_NAME,
        error: error.to_string(),
        username: username.to_string(),
        redirect_to: redirect_to.to_string(),
    };
    Html(template.render().unwrap_or_else(|_| "Template error".to_string())).into_response()
}

/// Check credentials. Unknown user and wrong password read the same.
/// Returns the user id and its current session generation.
async fn authenticate(
    pool: &SqlitePool,
    username: &Username,
    password: &Password,
) -> Result<(UserId, i64), AppError> {
    let user = db::users::find_by_username(pool, username)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

    HashedPassword::from_string(user.password_hash)
        .verify(password)
        .map_err(|_| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

    let user_id = UserId::from_string(&user.id).map_err(|_| AppError::Internal)?;
    Ok((user_id, user.session_generation))
}

/// GET /login — Show login form.
pub async fn show(Query(query): Query<LoginQuery>) -> Response {
    render(
        query.error.as_deref().unwrap_or_default(),
        "",
        query.redirect_to.as_deref().unwrap_or_default(),
    )
}

/// POST /login — Authenticate, start a session, and resolve the default organization.
pub async fn submit(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let redirect_to = form.redirect_to.clone().unwrap_or_default();

    if form.validate().is_err() {
        return Ok(render("Invalid form data", &form.username, &redirect_to));
    }

    let username = match Username::new(form.username.clone()) {
        Ok(u) => u,
        Err(_) => return Ok(render(INVALID_CREDENTIALS, &form.username, &redirect_to)),
    };

    // Strength rules apply when a password is set, not when it is checked.
    let password = Password::for_verification(form.password);

    let (user_id, generation) = match authenticate(&state.db, &username, &password).await {
        Ok(found) => found,
        Err(AppError::Auth(msg)) => {
            tracing::info!(username = %username.as_str(), "login rejected");
            return Ok(render(&msg, username.as_str(), &redirect_to));
        }
        Err(err) => return Err(err),
    };

    let organization_id = match tenant::resolve_login_org(&state.db, &user_id).await {
        Ok(org) => org,
        Err(AppError::NoOrganization) => {
            tracing::warn!(user_id = %user_id, "login refused, user has no organizations");
            let jar = session::destroy_session(jar);
            return Ok((jar, render(NO_ORGANIZATION_MESSAGE, username.as_str(), "")).into_response());
        }
        Err(err) => return Err(err),
    };

    let mut session = Session::for_user(&user_id, form.remember.is_some()).with_generation(generation);
    if let Some(organization_id) = &organization_id {
        session.set_organization(organization_id);
    }
    let options = CommitOptions::from_session(&session, state.config.remember_for());
    let jar = session::commit_session(jar, &session, options)?;

    tracing::info!(
        user_id = %user_id,
        organization_id = ?organization_id.as_ref().map(|id| id.as_str()),
        "user logged in"
    );

    let target = redirect::safe_redirect_target(Some(&redirect_to));
    Ok((jar, Redirect::to(&target)).into_response())
}

/// Login routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(redirect::LOGIN_PATH, get(show).post(submit))
}
