use axum::{async_trait, extract::FromRef, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::warn;

use super::{
    services,
    session::{SessionKeys, SESSION_COOKIE},
};
use crate::{error::AppError, state::AppState};

/// The logged-in user as seen by handlers and templates.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

/// Session user if the request carries a valid session cookie.
pub struct MaybeUser(pub Option<SessionUser>);

impl MaybeUser {
    pub fn require(self) -> Result<SessionUser, AppError> {
        self.0.ok_or(AppError::Unauthorized)
    }
}

/// Rejects with 401 when no one is logged in.
pub struct AuthUser(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(MaybeUser(None));
        };

        let claims = match SessionKeys::from_ref(state).verify(&token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid or expired session cookie");
                return Ok(MaybeUser(None));
            }
        };

        // a token for a user that no longer exists is just an anonymous request
        let user = state.store.find_user(claims.sub).await?;
        Ok(MaybeUser(
            user.map(|u| services::session_user(&u, state.config.admin_email.as_deref())),
        ))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(AuthUser).ok_or(AppError::Unauthorized)
    }
}
