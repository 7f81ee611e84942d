use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod repo_types;

pub use repo_types::{Comment, ContactMessage, NewContactMessage, Post, PostFields, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique column rejected the write; carries the column's display name.
    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("record not found")]
    NotFound,

    /// A value is wider than its column; carries the field name when known.
    #[error("{0} is too long")]
    TooLong(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence seam for users, posts, comments and contact messages.
///
/// Listings come back pinned-first, then newest-first; comments in insertion order.
#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;
    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError>;
    async fn create_post(
        &self,
        author_id: i64,
        fields: &PostFields,
        date: &str,
    ) -> Result<i64, StoreError>;
    /// Overwrites the editable fields and re-assigns the author.
    async fn update_post(
        &self,
        id: i64,
        author_id: i64,
        fields: &PostFields,
    ) -> Result<(), StoreError>;
    async fn set_pinned(&self, id: i64, pinned: bool) -> Result<(), StoreError>;
    /// Removes the post together with its comments.
    async fn delete_post(&self, id: i64) -> Result<(), StoreError>;

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError>;
    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, StoreError>;
    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<Comment, StoreError>;
    async fn delete_comment(&self, id: i64) -> Result<(), StoreError>;

    async fn insert_contact_message(
        &self,
        msg: &NewContactMessage,
    ) -> Result<ContactMessage, StoreError>;
}
