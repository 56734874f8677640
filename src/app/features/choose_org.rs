//! Organization chooser.
//!
//! Reached whenever a protected request finds no active organization. Walks
//! `NoOrgChosen` (load memberships; none is fatal) to `Presenting` (list them,
//! accept a choice) to `Committed` (membership validated, session written and
//! committed once, redirect to where the user was going).

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::app::{
    domain::OrganizationId,
    error::AppError,
    identity::CurrentUser,
    redirect,
    session::{self, CommitOptions},
    tenant::{self, MembershipSummary},
    AppState, APP_NAME,
};

const INVALID_CHOICE: &str = "Choose one of your organizations.";

#[derive(Debug, Deserialize)]
pub struct ChooseOrgQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Chooser form data from HTTP request.
#[derive(Debug, Deserialize)]
pub struct ChooseOrgForm {
    #[serde(rename = "organizationId", default)]
    pub organization_id: String,

    /// Checkbox; present when the choice should become the default.
    pub remember: Option<String>,

    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// One selectable organization.
pub struct OrgOption {
    pub id: String,
    pub name: String,
    pub role: String,
    pub is_default: bool,
}

#[derive(Template)]
#[template(path = "choose_org.html")]
pub struct ChooseOrgTemplate {
    pub app_name: &'static str,
    pub display_name: String,
    pub options: Vec<OrgOption>,
    pub redirect_to: String,
    pub field_error: String,
}

/// Where the chooser stands after handling a request.
#[derive(Debug)]
pub enum ChooserState {
    Presenting {
        memberships: Vec<MembershipSummary>,
        field_error: Option<&'static str>,
    },
    Committed {
        organization_id: OrganizationId,
    },
}

/// `NoOrgChosen`: load candidates. No memberships at all is fatal.
async fn candidates(pool: &SqlitePool, user: &CurrentUser) -> Result<Vec<MembershipSummary>, AppError> {
    let memberships = tenant::list_memberships(pool, &user.id).await?;
    if memberships.is_empty() {
        return Err(AppError::NoOrganization);
    }
    Ok(memberships)
}

/// `Presenting` + submission: validate and persist the choice.
/// An invalid choice stays in `Presenting` with a field error.
pub async fn choose(
    pool: &SqlitePool,
    user: &CurrentUser,
    memberships: Vec<MembershipSummary>,
    submitted: &str,
    remember: bool,
) -> Result<ChooserState, AppError> {
    let organization_id = match OrganizationId::from_string(submitted.trim()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(ChooserState::Presenting {
                memberships,
                field_error: Some(INVALID_CHOICE),
            })
        }
    };

    match tenant::select_org(pool, &user.id, &organization_id, remember).await {
        Ok(_) => Ok(ChooserState::Committed { organization_id }),
        Err(AppError::InvalidOrgSelection) => {
            tracing::warn!(user_id = %user.id, organization_id = %organization_id, "rejected selection of a non-member organization");
            Ok(ChooserState::Presenting {
                memberships,
                field_error: Some(INVALID_CHOICE),
            })
        }
        Err(err) => Err(err),
    }
}

fn render(user: &CurrentUser, memberships: Vec<MembershipSummary>, redirect_to: &str, field_error: &str) -> Html<String> {
    let options = memberships
        .into_iter()
        .map(|m| OrgOption {
            id: m.organization_id.as_str(),
            name: m.organization_name,
            role: m.role.to_string(),
            is_default: m.is_default,
        })
        .collect();

    let template = ChooseOrgTemplate {
        app_name: APP_NAME,
        display_name: user.display_name(),
        options,
        redirect_to: redirect_to.to_string(),
        field_error: field_error.to_string(),
    };
    Html(template.render().unwrap_or_else(|_| "Template error".to_string()))
}

/// GET /choose-org — List the user's organizations.
pub async fn show(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ChooseOrgQuery>,
) -> Result<Response, AppError> {
    let memberships = candidates(&state.db, &user).await?;
    let redirect_to = redirect::safe_redirect_target(query.redirect_to.as_deref());
    Ok(render(&user, memberships, &redirect_to, "").into_response())
}

/// POST /choose-org — Activate the chosen organization for this session.
pub async fn submit(
    user: CurrentUser,
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<ChooseOrgForm>,
) -> Result<Response, AppError> {
    let memberships = candidates(&state.db, &user).await?;
    let redirect_to = redirect::safe_redirect_target(form.redirect_to.as_deref());

    let outcome = choose(
        &state.db,
        &user,
        memberships,
        &form.organization_id,
        form.remember.is_some(),
    )
    .await?;

    match outcome {
        ChooserState::Presenting { memberships, field_error } => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            render(&user, memberships, &redirect_to, field_error.unwrap_or_default()),
        )
            .into_response()),
        ChooserState::Committed { organization_id } => {
            let mut current = session::get_session(&jar);
            current.set_organization(&organization_id);
            let options = CommitOptions::from_session(&current, state.config.remember_for());
            let jar = session::commit_session(jar, &current, options)?;
            Ok((jar, Redirect::to(&redirect_to)).into_response())
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route(redirect::CHOOSE_ORG_PATH, get(show).post(submit))
}
