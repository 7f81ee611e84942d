use time::{macros::format_description, OffsetDateTime};
use tracing::{info, warn};

use super::dto::PostInput;
use crate::{
    auth::{extractors::SessionUser, services::require_admin},
    error::{required, AppError},
    state::AppState,
    store::{Comment, Post, PostFields, StoreError},
};

/// Display date stored on new posts, e.g. "October 19, 2026".
pub fn display_date(at: OffsetDateTime) -> String {
    let format = format_description!("[month repr:long] [day], [year]");
    at.format(&format).unwrap_or_default()
}

fn validate(input: PostInput) -> Result<PostFields, AppError> {
    Ok(PostFields {
        title: required(input.title, "title")?,
        subtitle: required(input.subtitle, "subtitle")?,
        body: required(input.body, "body")?,
        img_url: required(input.img_url, "img_url")?,
    })
}

fn title_conflict(e: StoreError) -> AppError {
    match e {
        StoreError::Duplicate(_) => AppError::Conflict("A post with that title already exists".into()),
        other => other.into(),
    }
}

fn post_not_found(e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::NotFound("Post"),
        other => other.into(),
    }
}

pub async fn list_posts(state: &AppState) -> Result<Vec<Post>, AppError> {
    Ok(state.store.list_posts().await?)
}

pub async fn find_post(state: &AppState, id: i64) -> Result<Post, AppError> {
    state
        .store
        .find_post(id)
        .await?
        .ok_or(AppError::NotFound("Post"))
}

pub async fn get_post(state: &AppState, id: i64) -> Result<(Post, Vec<Comment>), AppError> {
    let post = find_post(state, id).await?;
    let comments = state.store.list_comments(id).await?;
    Ok((post, comments))
}

pub async fn create_post(
    state: &AppState,
    actor: &SessionUser,
    input: PostInput,
) -> Result<i64, AppError> {
    let fields = validate(input)?;
    let date = display_date(OffsetDateTime::now_utc());
    let id = state
        .store
        .create_post(actor.id, &fields, &date)
        .await
        .map_err(title_conflict)?;
    info!(post_id = id, user_id = actor.id, "post created");
    Ok(id)
}

/// Admin edit. The editing admin becomes the post's author.
pub async fn edit_post(
    state: &AppState,
    actor: &SessionUser,
    id: i64,
    input: PostInput,
) -> Result<(), AppError> {
    require_admin(actor)?;
    find_post(state, id).await?;
    let fields = validate(input)?;
    state
        .store
        .update_post(id, actor.id, &fields)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("Post"),
            other => title_conflict(other),
        })?;
    info!(post_id = id, user_id = actor.id, "post edited");
    Ok(())
}

pub async fn delete_post(state: &AppState, actor: &SessionUser, id: i64) -> Result<(), AppError> {
    require_admin(actor)?;
    state.store.delete_post(id).await.map_err(post_not_found)?;
    info!(post_id = id, user_id = actor.id, "post deleted");
    Ok(())
}

/// Sets the pin flag when given, toggles it otherwise. Returns the new value.
pub async fn pin_post(
    state: &AppState,
    actor: &SessionUser,
    id: i64,
    pinned: Option<bool>,
) -> Result<bool, AppError> {
    require_admin(actor)?;
    let post = find_post(state, id).await?;
    let pinned = pinned.unwrap_or(!post.pinned);
    state
        .store
        .set_pinned(id, pinned)
        .await
        .map_err(post_not_found)?;
    info!(post_id = id, pinned, "post pin updated");
    Ok(pinned)
}

pub async fn add_comment(
    state: &AppState,
    actor: &SessionUser,
    post_id: i64,
    text: Option<String>,
) -> Result<Comment, AppError> {
    find_post(state, post_id).await?;
    let text = required(text, "text")
        .map_err(|_| AppError::Validation("Comment text required".into()))?;
    let comment = state
        .store
        .create_comment(post_id, actor.id, &text)
        .await
        .map_err(post_not_found)?;
    info!(comment_id = comment.id, post_id, user_id = actor.id, "comment added");
    Ok(comment)
}

/// Allowed for the comment's author, the post's author and the admin.
pub async fn delete_comment(
    state: &AppState,
    actor: &SessionUser,
    id: i64,
) -> Result<(), AppError> {
    let comment = state
        .store
        .find_comment(id)
        .await?
        .ok_or(AppError::NotFound("Comment"))?;

    let post_author = state
        .store
        .find_post(comment.post_id)
        .await?
        .map(|p| p.author_id);

    let allowed =
        actor.is_admin || comment.author_id == actor.id || post_author == Some(actor.id);
    if !allowed {
        warn!(comment_id = id, user_id = actor.id, "comment delete refused");
        return Err(AppError::Forbidden);
    }

    state.store.delete_comment(id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound("Comment"),
        other => other.into(),
    })?;
    info!(comment_id = id, user_id = actor.id, "comment deleted");
    Ok(())
}
