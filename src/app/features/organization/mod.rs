mod members;

use axum::Router;

use crate::app::AppState;

/// Organization settings routes.
pub fn routes() -> Router<AppState> {
    Router::new().merge(members::routes())
}
