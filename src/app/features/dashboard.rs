use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::app::{
    authorization::RolePolicy,
    db,
    error::AppError,
    redirect,
    tenant::{self, RequestContext},
    AppState, APP_NAME,
};

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub app_name: &'static str,
    pub display_name: String,
    pub organization_name: String,
    pub role: String,
    pub is_admin: bool,
    pub account_count: usize,
    pub can_switch: bool,
    pub switch_url: String,
}

/// GET / — Overview of the active organization.
pub async fn show(ctx: RequestContext, State(state): State<AppState>) -> Result<Response, AppError> {
    ctx.authorize(&RolePolicy::ANY_AUTHENTICATED)?;

    let organization = db::organizations::find_by_id(&state.db, &ctx.organization_id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    let accounts = db::accounts::list_for_organization(&state.db, &ctx.organization_id)
        .await
        .map_err(AppError::Database)?;
    let memberships = tenant::list_memberships(&state.db, &ctx.user.id).await?;

    let template = DashboardTemplate {
        app_name: APP_NAME,
        display_name: ctx.user.display_name(),
        organization_name: organization.name,
        role: ctx.role.to_string(),
        is_admin: RolePolicy::ADMIN.permits(ctx.user.role, Some(ctx.role)),
        account_count: accounts.len(),
        can_switch: memberships.len() > 1,
        switch_url: redirect::choose_org_url(redirect::HOME_PATH),
    };
    Ok(Html(template.render().unwrap_or_else(|_| "Template error".to_string())).into_response())
}

/// Dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(redirect::HOME_PATH, get(show))
}
