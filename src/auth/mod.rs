use crate::state::AppState;
use axum::Router;

pub mod csrf;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod services;
pub mod session;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
        .merge(csrf::csrf_routes())
}
