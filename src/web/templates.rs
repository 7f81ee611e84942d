use anyhow::Context as _;
use axum::response::Html;
use tera::{Context, Tera};

use crate::{auth::extractors::SessionUser, error::AppError, state::AppState};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("post.html", include_str!("../../templates/post.html")),
    ("make-post.html", include_str!("../../templates/make-post.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("about.html", include_str!("../../templates/about.html")),
    ("contact.html", include_str!("../../templates/contact.html")),
];

/// Builds the template set from the files embedded at compile time.
pub fn load() -> anyhow::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())
        .context("parse templates")?;
    tera.autoescape_on(vec![".html"]);
    Ok(tera)
}

/// Context every page starts from.
pub fn page(user: &Option<SessionUser>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("current_user", user);
    ctx.insert("is_admin", &user.as_ref().is_some_and(|u| u.is_admin));
    ctx
}

pub fn render(state: &AppState, name: &str, ctx: &Context) -> Result<Html<String>, AppError> {
    state
        .templates
        .render(name, ctx)
        .map(Html)
        .with_context(|| format!("render {name}"))
        .map_err(AppError::Internal)
}
