pub mod handlers;
pub mod templates;

use crate::state::AppState;
use axum::Router;

/// Server-rendered pages. Shares services and the session cookie with the JSON API.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::page_routes())
        .merge(handlers::account_routes())
}
