use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use tracing::warn;

use super::{dto::OkResponse, session::same_site};
use crate::{error::AppError, state::AppState};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrftoken";
const CSRF_HEADER_ALT: &str = "x-csrf-token";

pub fn csrf_routes() -> Router<AppState> {
    Router::new().route("/api/csrf-token", get(csrf_token))
}

fn generate_token() -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Readable by scripts so the SPA can echo it back in a header.
pub async fn csrf_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<OkResponse>) {
    let cfg = &state.config.session;
    let cookie = Cookie::build((CSRF_COOKIE, generate_token()))
        .path("/")
        .secure(cfg.cookie_secure)
        .same_site(same_site(cfg.cookie_same_site))
        .build();
    (jar.add(cookie), Json(OkResponse::ok()))
}

fn header_token(headers: &HeaderMap) -> Option<&str> {
    [CSRF_HEADER, CSRF_HEADER_ALT]
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

fn tokens_match(expected: &str, given: &str) -> bool {
    expected.len() == given.len()
        && expected
            .bytes()
            .zip(given.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Double-submit check: state-changing `/api` requests must echo the
/// `csrf_token` cookie in an `X-CSRFToken` header.
pub async fn require_csrf_token(request: Request, next: Next) -> Result<Response, AppError> {
    let safe = [Method::GET, Method::HEAD, Method::OPTIONS].contains(request.method());
    if safe || !request.uri().path().starts_with("/api/") {
        return Ok(next.run(request).await);
    }

    let jar = CookieJar::from_headers(request.headers());
    let valid = match (jar.get(CSRF_COOKIE), header_token(request.headers())) {
        (Some(cookie), Some(given)) => {
            !cookie.value().is_empty() && tokens_match(cookie.value(), given)
        }
        _ => false,
    };
    if !valid {
        warn!(method = %request.method(), path = %request.uri().path(), "csrf check failed");
        return Err(AppError::CsrfRejected);
    }
    Ok(next.run(request).await)
}
