use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::app::{
    authorization::RolePolicy,
    db,
    domain::{Email, Role, UserId},
    error::AppError,
    mail::{self, EmailMessage},
    tenant::RequestContext,
    AppState, APP_NAME,
};

const MEMBERS_PATH: &str = "/settings/members";

#[derive(Debug, Deserialize)]
pub struct MembersQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// One row of the members table.
pub struct MemberRow {
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_self: bool,
}

#[derive(Template)]
#[template(path = "members.html")]
pub struct MembersTemplate {
    pub app_name: &'static str,
    pub organization_name: String,
    pub members: Vec<MemberRow>,
    pub success: String,
    pub error: String,
}

fn members_url(key: &str, message: &str) -> String {
    format!("{}?{}={}", MEMBERS_PATH, key, urlencoding::encode(message))
}

/// GET /settings/members — Members of the active organization. Admins only.
pub async fn list(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<MembersQuery>,
) -> Result<Response, AppError> {
    ctx.authorize(&RolePolicy::ADMIN)?;

    let organization = db::organizations::find_by_id(&state.db, &ctx.organization_id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    let me = ctx.user.id.as_str();
    let members = db::memberships::list_for_organization(&state.db, &ctx.organization_id)
        .await
        .map_err(AppError::Database)?
        .into_iter()
        .map(|m| {
            let name = format!(
                "{} {}",
                m.first_name.as_deref().unwrap_or_default(),
                m.last_name.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string();
            MemberRow {
                is_self: m.user_id == me,
                user_id: m.user_id,
                username: m.username,
                name,
                email: m.email.unwrap_or_default(),
                role: Role::from_stored(&m.role).to_string(),
            }
        })
        .collect();

    let template = MembersTemplate {
        app_name: APP_NAME,
        organization_name: organization.name,
        members,
        success: query.success.unwrap_or_default(),
        error: query.error.unwrap_or_default(),
    };
    Ok(Html(template.render().unwrap_or_else(|_| "Template error".to_string())).into_response())
}

/// POST /settings/members/:user_id/remove — Remove a member and tell them by email.
pub async fn remove(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    ctx.authorize(&RolePolicy::ADMIN)?;

    let target = UserId::from_string(&user_id).map_err(|_| AppError::NotFound("Not found".to_string()))?;
    if target == ctx.user.id {
        return Ok(Redirect::to(&members_url("error", "You cannot remove yourself.")).into_response());
    }

    let mut tx = state.db.begin().await.map_err(AppError::Database)?;
    db::memberships::find(&mut *tx, &target, &ctx.organization_id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    if !db::memberships::delete_unless_last_admin(&mut *tx, &target, &ctx.organization_id)
        .await
        .map_err(AppError::Database)?
    {
        return Ok(Redirect::to(&members_url("error", "An organization needs at least one admin.")).into_response());
    }
    tx.commit().await.map_err(AppError::Database)?;
    tracing::info!(
        organization_id = %ctx.organization_id,
        removed_user_id = %target,
        removed_by = %ctx.user.id,
        "member removed"
    );

    notify_removed(&state, &ctx, &target).await?;

    Ok(Redirect::to(&members_url("success", "Member removed.")).into_response())
}

async fn notify_removed(state: &AppState, ctx: &RequestContext, user_id: &UserId) -> Result<(), AppError> {
    let contact = db::contacts::find_by_user(&state.db, user_id)
        .await
        .map_err(AppError::Database)?;
    let Some(to) = contact.and_then(|c| c.email).and_then(|e| Email::new(e).ok()) else {
        return Ok(());
    };
    let organization_name = db::organizations::find_by_id(&state.db, &ctx.organization_id)
        .await
        .map_err(AppError::Database)?
        .map(|o| o.name)
        .unwrap_or_default();

    let message = EmailMessage::new(
        to,
        format!("You were removed from {}", organization_name),
        format!(
            "{} removed your access to {} in {}.",
            ctx.user.display_name(),
            organization_name,
            APP_NAME
        ),
        state.config.mail_from.clone(),
    );
    mail::deliver(state.mail.as_ref(), &message).await;
    Ok(())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(MEMBERS_PATH, get(list))
        .route("/settings/members/:user_id/remove", post(remove))
}
