//! Tenant isolation enforcement.
//!
//! **Rule**: Never trust session org. Validate membership on every read/write.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::SqlitePool;

use crate::app::{
    authorization::{self, RolePolicy},
    db,
    domain::{OrganizationId, Role, UserId},
    error::AppError,
    identity::{self, CurrentUser},
    redirect,
    session::{self, Session},
    AppState,
};

/// One organization the user belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSummary {
    pub organization_id: OrganizationId,
    pub organization_name: String,
    pub role: Role,
    pub is_default: bool,
}

/// Organizations the user belongs to, in storage order.
pub async fn list_memberships(
    pool: &SqlitePool,
    user_id: &UserId,
) -> Result<Vec<MembershipSummary>, AppError> {
    let rows = db::memberships::list_for_user(pool, user_id)
        .await
        .map_err(AppError::Database)?;

    Ok(rows
        .into_iter()
        .filter_map(|row| match OrganizationId::from_string(&row.organization_id) {
            Ok(organization_id) => Some(MembershipSummary {
                organization_id,
                organization_name: row.organization_name,
                role: Role::from_stored(&row.role),
                is_default: row.is_default,
            }),
            Err(_) => {
                tracing::warn!(organization_id = %row.organization_id, "skipping membership with malformed organization id");
                None
            }
        })
        .collect())
}

/// Active organization stored in the session.
///
/// Fails with `OrgNotSelected` (carrying `redirect_to`) when none is set.
pub fn require_active_org(session: &Session, redirect_to: &str) -> Result<OrganizationId, AppError> {
    session
        .organization_id
        .as_deref()
        .and_then(|raw| OrganizationId::from_string(raw).ok())
        .ok_or_else(|| AppError::OrgNotSelected {
            redirect_to: redirect_to.to_string(),
        })
}

/// Validates that the user is a member of the organisation. Returns the member's role.
///
/// Returns `NotFound` (not `Forbidden`) to avoid leaking whether the org exists.
pub async fn require_org_member(
    pool: &SqlitePool,
    user_id: &UserId,
    organization_id: &OrganizationId,
) -> Result<Role, AppError> {
    db::memberships::find(pool, user_id, organization_id)
        .await
        .map_err(AppError::Database)?
        .map(|m| m.role())
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))
}

/// Make `organization_id` the user's selection, updating the remembered default.
///
/// The membership must exist. Defaults are cleared unconditionally on every
/// selection and, with `remember`, set again on the chosen membership only.
/// Both writes run in one transaction.
pub async fn select_org(
    pool: &SqlitePool,
    user_id: &UserId,
    organization_id: &OrganizationId,
    remember: bool,
) -> Result<Role, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Database)?;

    let membership = db::memberships::find(&mut *tx, user_id, organization_id)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::InvalidOrgSelection)?;

    db::memberships::clear_defaults(&mut *tx, user_id)
        .await
        .map_err(AppError::Database)?;

    if remember {
        db::memberships::set_default(&mut *tx, user_id, organization_id, true)
            .await
            .map_err(AppError::Database)?;
    }

    tx.commit().await.map_err(AppError::Database)?;

    tracing::info!(user_id = %user_id, organization_id = %organization_id, remember, "organization selected");
    Ok(membership.role())
}

/// Organization to activate right after login.
///
/// `NoOrganization` when the user belongs nowhere; the remembered default when
/// there is one; otherwise `None` and the chooser runs on the next request.
pub async fn resolve_login_org(
    pool: &SqlitePool,
    user_id: &UserId,
) -> Result<Option<OrganizationId>, AppError> {
    let memberships = list_memberships(pool, user_id).await?;
    if memberships.is_empty() {
        return Err(AppError::NoOrganization);
    }

    Ok(memberships
        .into_iter()
        .find(|m| m.is_default)
        .map(|m| m.organization_id))
}

/// Everything a protected handler knows about the caller, resolved once per
/// request: the user, the active organization, and the user's role in it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: CurrentUser,
    pub organization_id: OrganizationId,
    pub role: Role,
}

impl RequestContext {
    /// Check this request against a route policy using the per-org role.
    pub fn authorize(&self, policy: &RolePolicy) -> Result<(), AppError> {
        authorization::require_role(&self.user, Some(self.role), policy)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session::from_parts(parts, state);
        let redirect_to = redirect::original_path(&parts.uri);

        let user = identity::require_user(&state.db, &session, &redirect_to).await?;
        let organization_id = require_active_org(&session, &redirect_to)?;

        // A membership removed since the org was chosen sends the user back to the chooser.
        let role = match require_org_member(&state.db, &user.id, &organization_id).await {
            Ok(role) => role,
            Err(AppError::NotFound(_)) => {
                tracing::info!(user_id = %user.id, organization_id = %organization_id, "session organization is no longer a membership");
                return Err(AppError::OrgNotSelected { redirect_to });
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            user,
            organization_id,
            role,
        })
    }
}
