use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::app::{
    authorization,
    db::{self, organizations::Organization},
    error::AppError,
    identity::CurrentUser,
    AppState, APP_NAME,
};

#[derive(Template)]
#[template(path = "admin_organizations.html")]
pub struct AdminOrganizationsTemplate {
    pub app_name: &'static str,
    pub organizations: Vec<Organization>,
}

/// GET /admin/organizations — Every organization. Superadmins only; no active org needed.
pub async fn list_organizations(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    authorization::require_super_admin(&user)?;

    let organizations = db::organizations::list_all(&state.db)
        .await
        .map_err(AppError::Database)?;

    let template = AdminOrganizationsTemplate {
        app_name: APP_NAME,
        organizations,
    };
    Ok(Html(template.render().unwrap_or_else(|_| "Template error".to_string())).into_response())
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/organizations", get(list_organizations))
}
