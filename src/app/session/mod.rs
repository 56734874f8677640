//! Signed-cookie session store.
//!
//! The whole session lives in one cookie, signed with the app's [`Key`]. A
//! missing, tampered or undecodable cookie reads as an empty session. Handlers
//! read the session once, apply every change, then commit once.
//!
//! Every commit stamps an expiry into the signed payload, so a captured cookie
//! stops working server-side once its lifetime is over, whatever the browser
//! does with `Max-Age`. The payload also carries the user's session generation,
//! checked against the database by the identity resolver.

use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::app::{
    domain::{OrganizationId, UserId},
    error::AppError,
    AppState,
};

/// Server-side lifetime of a cookie committed without `Max-Age`.
pub const SESSION_ONLY_LIFETIME: Duration = Duration::hours(12);

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Session payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Active organization for this browser session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// Whether the cookie should outlive the browser session.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub remember: bool,

    /// `users.session_generation` at login. A password change bumps the
    /// stored value and strands every older cookie.
    #[serde(default)]
    pub generation: i64,

    /// Unix seconds after which the payload is rejected. Stamped on commit.
    #[serde(default)]
    pub expires_at: i64,
}

impl Session {
    /// Fresh session for a user who just logged in. No organization yet.
    pub fn for_user(user_id: &UserId, remember: bool) -> Self {
        Self {
            user_id: Some(user_id.as_str()),
            remember,
            ..Self::default()
        }
    }

    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = generation;
        self
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.organization_id.is_none()
    }

    pub fn set_organization(&mut self, organization_id: &OrganizationId) {
        self.organization_id = Some(organization_id.as_str());
    }

    fn encode(&self) -> Result<String, serde_json::Error> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
    }

    fn decode(value: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Persistence of the committed cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// `None` writes a browser-session cookie.
    pub max_age: Option<Duration>,
}

impl CommitOptions {
    pub fn session_only() -> Self {
        Self { max_age: None }
    }

    pub fn persistent(max_age: Duration) -> Self {
        Self { max_age: Some(max_age) }
    }

    /// Keep a remembered session persistent across re-commits.
    pub fn from_session(session: &Session, remember_for: Duration) -> Self {
        if session.remember {
            Self::persistent(remember_for)
        } else {
            Self::session_only()
        }
    }
}

/// Build the cookie signing key from the configured secret.
pub fn key_from_secret(secret: &str) -> Result<Key, String> {
    Key::try_from(secret.as_bytes()).map_err(|e| format!("SESSION_SECRET: {}", e))
}

/// Read the session from a signed jar. Never fails.
pub fn get_session(jar: &SignedCookieJar) -> Session {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Session::default();
    };
    let Some(session) = Session::decode(cookie.value()) else {
        tracing::debug!("session cookie verified but payload undecodable, treating as empty");
        return Session::default();
    };
    if session.is_expired(OffsetDateTime::now_utc().unix_timestamp()) {
        tracing::debug!(expires_at = session.expires_at, "session cookie expired, treating as empty");
        return Session::default();
    }
    session
}

/// Read the session straight from request parts (used by extractors).
pub fn from_parts(parts: &Parts, state: &AppState) -> Session {
    let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
    get_session(&jar)
}

/// Serialize, sign and stage the session cookie on the jar.
/// An empty session is committed as a removal.
pub fn commit_session(
    jar: SignedCookieJar,
    session: &Session,
    options: CommitOptions,
) -> Result<SignedCookieJar, AppError> {
    if session.is_empty() {
        return Ok(destroy_session(jar));
    }

    let lifetime = options.max_age.unwrap_or(SESSION_ONLY_LIFETIME);
    let stamped = Session {
        expires_at: (OffsetDateTime::now_utc() + lifetime).unix_timestamp(),
        ..session.clone()
    };

    let value = stamped.encode().map_err(|err| {
        tracing::error!(%err, "failed to encode session");
        AppError::Internal
    })?;

    let mut cookie = Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/");
    if let Some(max_age) = options.max_age {
        cookie = cookie.max_age(max_age);
    }

    Ok(jar.add(cookie.build()))
}

/// Stage a cookie-clearing header on the jar.
pub fn destroy_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.add(clear_session_cookie())
}

/// Removal cookie for the session. Also used by error responses, which have no jar.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .removal()
        .into()
}
