use serde::{Deserialize, Serialize};

use super::extractors::SessionUser;

/// Request body (or form) for user registration.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Request body (or form) for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// `{"authenticated": false}` or the session user flattened beside the flag.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub authenticated: bool,
    #[serde(flatten)]
    pub user: Option<SessionUser>,
}

impl From<Option<SessionUser>> for WhoAmIResponse {
    fn from(user: Option<SessionUser>) -> Self {
        Self {
            authenticated: user.is_some(),
            user,
        }
    }
}

/// Public profile of the site owner.
#[derive(Debug, Serialize)]
pub struct AdminProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
}
