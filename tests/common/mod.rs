#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{body::Body, response::IntoResponse, Router};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use fundbook::app::{
    config::Config,
    db::{self, accounts::NewAccount, contacts::NewContact, organizations::NewOrganization},
    domain::{Email, HashedPassword, OrganizationId, Password, Role, UserId, Username},
    mail::{EmailError, EmailMessage, EmailSender},
    session::{self, CommitOptions, Session},
    AppState,
};
use fundbook::create_router;
use http_body_util::BodyExt;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower::ServiceExt;

pub const PASSWORD: &str = "ledger2026balance";

/// Mailer that keeps every message for inspection.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl RecordingMailer {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Single-connection in-memory database; every pool connection would otherwise get its own.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn test_state(pool: SqlitePool, mailer: RecordingMailer) -> AppState {
    AppState::new(pool, Arc::new(mailer), Config::for_tests()).unwrap()
}

pub fn test_router(pool: SqlitePool) -> Router {
    create_router(test_state(pool, RecordingMailer::default()))
}

pub fn test_router_with_mailer(pool: SqlitePool, mailer: RecordingMailer) -> Router {
    create_router(test_state(pool, mailer))
}

pub async fn create_user(pool: &SqlitePool, username: &str, role: Role) -> UserId {
    let password = Password::new(PASSWORD.to_string()).unwrap();
    let user_id = UserId::new();
    db::users::insert(
        pool,
        &db::NewUser {
            id: user_id.clone(),
            username: Username::new(username.to_string()).unwrap(),
            password_hash: HashedPassword::from_password(&password).unwrap(),
            role,
        },
    )
    .await
    .unwrap();
    user_id
}

pub async fn add_contact(pool: &SqlitePool, user_id: &UserId, first: &str, last: &str, email: &str) {
    db::contacts::insert(
        pool,
        &NewContact {
            user_id: user_id.clone(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: Some(Email::new(email.to_string()).unwrap()),
        },
    )
    .await
    .unwrap();
}

pub async fn create_org(pool: &SqlitePool, name: &str, host: Option<&str>) -> OrganizationId {
    let id = OrganizationId::new();
    db::organizations::insert(
        pool,
        &NewOrganization {
            id: id.clone(),
            name: name.to_string(),
            host: host.map(str::to_string),
            subdomain: None,
        },
    )
    .await
    .unwrap();
    id
}

pub async fn add_member(pool: &SqlitePool, org: &OrganizationId, user: &UserId, role: Role, is_default: bool) {
    db::memberships::insert(pool, org, user, role, is_default).await.unwrap();
}

pub async fn create_account(pool: &SqlitePool, org: &OrganizationId, name: &str) -> String {
    db::accounts::insert(
        pool,
        &NewAccount {
            organization_id: org.clone(),
            name: name.to_string(),
            description: None,
        },
    )
    .await
    .unwrap()
}

pub async fn default_orgs(pool: &SqlitePool, user: &UserId) -> Vec<String> {
    db::memberships::list_for_user(pool, user)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.is_default)
        .map(|m| m.organization_id)
        .collect()
}

pub fn login_form_body(username: &str, password: &str, remember: bool, redirect_to: Option<&str>) -> String {
    let mut body = format!(
        "username={}&password={}",
        urlencoding::encode(username),
        urlencoding::encode(password)
    );
    if remember {
        body.push_str("&remember=on");
    }
    if let Some(target) = redirect_to {
        body.push_str(&format!("&redirectTo={}", urlencoding::encode(target)));
    }
    body
}

pub fn choose_org_form_body(organization_id: &str, remember: bool, redirect_to: Option<&str>) -> String {
    let mut body = format!("organizationId={}", urlencoding::encode(organization_id));
    if remember {
        body.push_str("&remember=on");
    }
    if let Some(target) = redirect_to {
        body.push_str(&format!("&redirectTo={}", urlencoding::encode(target)));
    }
    body
}

pub fn form_request(uri: &str, body: String, cookie: Option<&str>) -> http::Request<Body> {
    let mut builder = http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> http::Request<Body> {
    let mut builder = http::Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// All Set-Cookie headers of a response.
pub fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The `session=...` pair of a response that set a live session cookie.
pub fn session_cookie(response: &axum::response::Response) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .filter(|header| !header.to_lowercase().contains("max-age=0"))
        .filter_map(|header| header.split(';').next().map(str::to_string))
        .find(|pair| pair.starts_with("session=") && pair.len() > "session=".len())
}

/// True when the response clears the session cookie.
pub fn clears_session(response: &axum::response::Response) -> bool {
    set_cookies(response)
        .iter()
        .any(|header| header.starts_with("session=") && header.to_lowercase().contains("max-age=0"))
}

pub fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get("location")
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Log in through the form and return the session cookie pair.
pub async fn login(app: &Router, username: &str, remember: bool) -> String {
    let response = app
        .clone()
        .oneshot(form_request("/login", login_form_body(username, PASSWORD, remember, None), None))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::SEE_OTHER, "login should redirect");
    session_cookie(&response).expect("login should set a session cookie")
}

/// Sign an arbitrary session with the test key, as if the server had committed it.
pub fn signed_session_cookie(session: &Session) -> String {
    let key = session::key_from_secret(&Config::for_tests().session_secret).unwrap();
    let jar = session::commit_session(SignedCookieJar::new(key), session, CommitOptions::session_only()).unwrap();
    let response = (jar, ()).into_response();
    session_cookie(&response).expect("session cookie")
}

/// Sign a payload whose expiry passed a minute ago. Commit always stamps a
/// future expiry, so the cookie is built by hand.
pub fn expired_session_cookie(user_id: &UserId) -> String {
    let key = session::key_from_secret(&Config::for_tests().session_secret).unwrap();
    let payload = serde_json::json!({
        "userId": user_id.as_str(),
        "remember": true,
        "generation": 0,
        "expiresAt": time::OffsetDateTime::now_utc().unix_timestamp() - 60,
    });
    let value = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
    let jar = SignedCookieJar::new(key).add(Cookie::new(session::SESSION_COOKIE, value));
    session_cookie(&(jar, ()).into_response()).expect("session cookie")
}
