//! Resolves the session's user id to a user.
//!
//! "Not logged in" is a normal state and resolves to `None`. A user id that no
//! longer resolves is not: it becomes [`AppError::SessionInconsistent`], which
//! clears the cookie instead of leaving a stale session behind. The same
//! holds for a session minted before the user's last password change.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::SqlitePool;

use crate::app::{
    db::{self, contacts::Contact},
    domain::{Role, UserId},
    error::AppError,
    redirect,
    session::{self, Session},
    AppState,
};

/// The authenticated user for this request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    /// Global role. Per-organization roles live on memberships.
    pub role: Role,
    pub contact: Option<Contact>,
}

impl CurrentUser {
    pub fn display_name(&self) -> String {
        self.contact
            .as_ref()
            .and_then(Contact::display_name)
            .unwrap_or_else(|| self.username.clone())
    }
}

/// User id stored in the session, if any.
///
/// Fails only when the stored value is not a valid id.
pub fn get_user_id(session: &Session) -> Result<Option<UserId>, AppError> {
    match session.user_id.as_deref() {
        None => Ok(None),
        Some(raw) => UserId::from_string(raw).map(Some).map_err(|_| {
            tracing::warn!(user_id = raw, "session carries an unparseable user id");
            AppError::SessionInconsistent
        }),
    }
}

/// Like [`get_user_id`], but absence is `Unauthenticated` carrying `redirect_to`.
pub fn require_user_id(session: &Session, redirect_to: &str) -> Result<UserId, AppError> {
    get_user_id(session)?.ok_or_else(|| AppError::Unauthenticated {
        redirect_to: redirect_to.to_string(),
    })
}

/// Load a user with its contact. A missing user, or a `generation` older
/// than the user's current one, is a dangling session.
pub async fn load_user(pool: &SqlitePool, user_id: &UserId, generation: i64) -> Result<CurrentUser, AppError> {
    let user = db::users::find_by_id(pool, user_id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| {
            tracing::warn!(user_id = %user_id, "session user no longer exists");
            AppError::SessionInconsistent
        })?;

    if user.session_generation != generation {
        tracing::info!(user_id = %user_id, "session predates the last password change");
        return Err(AppError::SessionInconsistent);
    }

    let contact = db::contacts::find_by_user(pool, user_id)
        .await
        .map_err(AppError::Database)?;

    Ok(CurrentUser {
        id: user_id.clone(),
        role: user.role(),
        username: user.username,
        contact,
    })
}

/// Resolve the session to a user. `None` when nobody is logged in.
pub async fn get_user(pool: &SqlitePool, session: &Session) -> Result<Option<CurrentUser>, AppError> {
    match get_user_id(session)? {
        Some(user_id) => load_user(pool, &user_id, session.generation).await.map(Some),
        None => Ok(None),
    }
}

/// Resolve the session to a user or fail with `Unauthenticated`.
pub async fn require_user(
    pool: &SqlitePool,
    session: &Session,
    redirect_to: &str,
) -> Result<CurrentUser, AppError> {
    let user_id = require_user_id(session, redirect_to)?;
    load_user(pool, &user_id, session.generation).await
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session::from_parts(parts, state);
        let redirect_to = redirect::original_path(&parts.uri);
        require_user(&state.db, &session, &redirect_to).await
    }
}
