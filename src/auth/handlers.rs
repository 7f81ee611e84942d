use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AdminProfile, LoginRequest, OkResponse, RegisterRequest, WhoAmIResponse},
        extractors::MaybeUser,
        services::{self, ADMIN_USER_ID},
        session::{end_session, start_session},
    },
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/api/whoami", get(whoami))
        .route("/api/me", get(whoami))
        .route("/api/admin", get(admin_profile))
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(CookieJar, Json<OkResponse>), AppError> {
    let user = services::register(&state, payload).await?;
    let jar = start_session(jar, &state, user.id)?;
    Ok((jar, Json(OkResponse::ok())))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<OkResponse>), AppError> {
    let user = services::login(&state, payload).await?;
    let jar = start_session(jar, &state, user.id)?;
    Ok((jar, Json(OkResponse::ok())))
}

#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<OkResponse>) {
    (end_session(jar), Json(OkResponse::ok()))
}

#[instrument(skip(user))]
pub async fn whoami(MaybeUser(user): MaybeUser) -> Json<WhoAmIResponse> {
    Json(user.into())
}

#[instrument(skip(state))]
pub async fn admin_profile(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let profile = state
        .store
        .find_user(ADMIN_USER_ID)
        .await?
        .map(|u| AdminProfile {
            id: u.id,
            name: u.name,
            email: u.email,
        });
    Ok(Json(match profile {
        Some(p) => json!(p),
        None => json!({}),
    }))
}
