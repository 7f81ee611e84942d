use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use time::{macros::format_description, OffsetDateTime};
use tracing::{info, instrument};

use crate::{
    auth::dto::OkResponse,
    error::{required, AppError},
    extract::ApiJson,
    state::AppState,
    store::NewContactMessage,
};

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/contact", post(submit_contact))
}

fn timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.format(&format).unwrap_or_default()
}

pub async fn submit(state: &AppState, req: ContactRequest) -> Result<(), AppError> {
    let all_required = |_| AppError::Validation("All fields required".into());
    let msg = NewContactMessage {
        name: required(req.name, "name").map_err(all_required)?,
        email: required(req.email, "email").map_err(all_required)?,
        message: required(req.message, "message").map_err(all_required)?,
        date: timestamp(OffsetDateTime::now_utc()),
    };
    let saved = state.store.insert_contact_message(&msg).await?;
    info!(contact_id = saved.id, "contact message stored");
    Ok(())
}

#[instrument(skip(state, body))]
pub async fn submit_contact(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ContactRequest>,
) -> Result<Json<OkResponse>, AppError> {
    submit(&state, body).await?;
    Ok(Json(OkResponse::ok()))
}
