use tracing::{info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest},
    extractors::SessionUser,
    password::{hash_password, verify_password},
};
use crate::{
    error::{required, AppError},
    state::AppState,
    store::{StoreError, User},
};

/// The first registered account owns the site.
pub const ADMIN_USER_ID: i64 = 1;

pub fn is_admin(user: &User, admin_email: Option<&str>) -> bool {
    user.id == ADMIN_USER_ID
        || admin_email.is_some_and(|admin| admin.eq_ignore_ascii_case(&user.email))
}

pub fn session_user(user: &User, admin_email: Option<&str>) -> SessionUser {
    SessionUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        is_admin: is_admin(user, admin_email),
    }
}

pub fn require_admin(actor: &SessionUser) -> Result<(), AppError> {
    if actor.is_admin {
        Ok(())
    } else {
        warn!(user_id = actor.id, "admin-only action refused");
        Err(AppError::Forbidden)
    }
}

fn normalize_email(raw: Option<String>) -> Result<String, AppError> {
    Ok(required(raw, "email")?.to_lowercase())
}

fn required_password(raw: Option<String>) -> Result<String, AppError> {
    raw.filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".into()))
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    let email = normalize_email(req.email)?;
    let name = required(req.name, "name")?;
    let password = required_password(req.password)?;

    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&password)?;
    let user = state
        .store
        .create_user(&email, &name, &hash)
        .await
        .map_err(|e| match e {
            // lost a race with a concurrent registration
            StoreError::Duplicate(_) => AppError::Conflict("Email already registered".into()),
            other => other.into(),
        })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<User, AppError> {
    let email = normalize_email(req.email)?;
    let password = required_password(req.password)?;

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, "user logged in");
    Ok(user)
}
