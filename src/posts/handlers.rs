use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        CommentRequest, CommentView, CreatedPostResponse, PinRequest, PinResponse, PostDetail,
        PostInput, PostSummary,
    },
    services,
};
use crate::{
    auth::{dto::OkResponse, extractors::AuthUser},
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/:id", get(get_post))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/api/posts", post(create_post))
        .route("/api/posts/:id", put(edit_post).delete(delete_post))
        .route("/api/posts/:id/pin", patch(pin_post))
        .route("/api/posts/:id/comments", post(add_comment))
        .route("/api/comments/:id", delete(delete_comment))
}

#[instrument(skip(state))]
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostSummary>>, AppError> {
    let posts = services::list_posts(&state).await?;
    Ok(Json(posts.into_iter().map(PostSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, AppError> {
    let (post, comments) = services::get_post(&state, id).await?;
    Ok(Json(PostDetail::new(post, comments)))
}

#[instrument(skip(state, body))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<PostInput>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<CreatedPostResponse>), AppError> {
    let id = services::create_post(&state, &user, body).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/posts/{id}"))],
        Json(CreatedPostResponse { id }),
    ))
}

#[instrument(skip(state, body))]
pub async fn edit_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<PostInput>,
) -> Result<Json<OkResponse>, AppError> {
    services::edit_post(&state, &user, id, body).await?;
    Ok(Json(OkResponse::ok()))
}

/// Body `{"pinned": ...}` is optional; without the key the flag toggles.
#[instrument(skip(state, body))]
pub async fn pin_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<PinResponse>, AppError> {
    let wanted = PinRequest::parse(&body)?.pinned;
    let pinned = services::pin_post(&state, &user, id, wanted).await?;
    Ok(Json(PinResponse { ok: true, pinned }))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, AppError> {
    services::delete_post(&state, &user, id).await?;
    Ok(Json(OkResponse::ok()))
}

#[instrument(skip(state, body))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<i64>,
    body: Option<ApiJson<CommentRequest>>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let text = body.and_then(|ApiJson(b)| b.text);
    let comment = services::add_comment(&state, &user, post_id, text).await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, AppError> {
    services::delete_comment(&state, &user, id).await?;
    Ok(Json(OkResponse::ok()))
}
