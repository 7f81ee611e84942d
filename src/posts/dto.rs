use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::AppError,
    store::{Comment, Post},
};

const ANONYMOUS: &str = "Anonymous";

/// Post fields as sent by the SPA or the post form. Missing and blank are the same.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInput {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub img_url: Option<String>,
}

/// Body of a pin request. `pinned` is `None` when the body is empty or has no `pinned` key.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PinRequest {
    pub pinned: Option<bool>,
}

impl PinRequest {
    /// Reads the raw body. A present `pinned` key is coerced by truthiness:
    /// null, false, 0, "", [] and {} unpin, anything else pins.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))?;
        Ok(Self {
            pinned: value.get("pinned").map(truthy),
        })
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub img_url: String,
    pub author: Option<String>,
    pub pinned: bool,
}

impl From<Post> for PostSummary {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            subtitle: p.subtitle,
            date: p.date,
            img_url: p.img_url,
            author: p.author_name,
            pinned: p.pinned,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub summary: PostSummary,
    pub body: String,
    pub comments: Vec<CommentView>,
}

impl PostDetail {
    pub fn new(mut post: Post, comments: Vec<Comment>) -> Self {
        let body = std::mem::take(&mut post.body);
        Self {
            summary: post.into(),
            body,
            comments: comments.into_iter().map(CommentView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub author_name: String,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        let name = c.author_name.unwrap_or_else(|| ANONYMOUS.to_string());
        Self {
            id: c.id,
            text: c.text,
            author: name.clone(),
            author_name: name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedPostResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct PinResponse {
    pub ok: bool,
    pub pinned: bool,
}
