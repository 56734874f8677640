use askama::Template;
use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::app::{
    authorization::RolePolicy,
    db::{self, accounts::Account},
    error::AppError,
    tenant::RequestContext,
    AppState, APP_NAME,
};

#[derive(Template)]
#[template(path = "accounts_list.html")]
pub struct AccountsListTemplate {
    pub app_name: &'static str,
    pub accounts: Vec<Account>,
}

#[derive(Template)]
#[template(path = "account_show.html")]
pub struct AccountShowTemplate {
    pub app_name: &'static str,
    pub account: Account,
}

/// GET /accounts — Accounts of the active organization.
pub async fn list(ctx: RequestContext, State(state): State<AppState>) -> Result<Response, AppError> {
    ctx.authorize(&RolePolicy::ANY_AUTHENTICATED)?;

    let accounts = db::accounts::list_for_organization(&state.db, &ctx.organization_id)
        .await
        .map_err(AppError::Database)?;

    let template = AccountsListTemplate {
        app_name: APP_NAME,
        accounts,
    };
    Ok(Html(template.render().unwrap_or_else(|_| "Template error".to_string())).into_response())
}

/// GET /accounts/:id — One account. Accounts of other organizations are 404.
pub async fn show(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    ctx.authorize(&RolePolicy::ANY_AUTHENTICATED)?;

    let account = db::accounts::find_in_organization(&state.db, &ctx.organization_id, &id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    let template = AccountShowTemplate {
        app_name: APP_NAME,
        account,
    };
    Ok(Html(template.render().unwrap_or_else(|_| "Template error".to_string())).into_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list))
        .route("/accounts/:id", get(show))
}
