use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::request::Parts,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tera::Context;
use tracing::{error, instrument};

use super::templates::{page, render};
use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        extractors::{MaybeUser, SessionUser},
        services as auth_services,
        session::{end_session, start_session},
    },
    contact::{self, ContactRequest},
    error::AppError,
    posts::{
        dto::{PostDetail, PostInput, PostSummary},
        services,
    },
    state::AppState,
};

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/post/:id", get(show_post).post(comment_on_post))
        .route("/new-post", get(new_post_form).post(create_post))
        .route("/edit-post/:id", get(edit_post_form).post(update_post))
        .route("/delete/:id", get(delete_post))
        .route("/about", get(about))
        .route("/contact", get(contact_form).post(send_contact))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
}

/// HTML face of `AppError`: anonymous users are sent to the login page.
pub struct WebError(AppError);

impl From<AppError> for WebError {
    fn from(e: AppError) -> Self {
        WebError(e)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::Unauthorized => Redirect::to("/login").into_response(),
            other => {
                let status = other.status();
                if let AppError::Internal(e) = &other {
                    error!(error = %e, "page request failed");
                }
                let body = format!(
                    "<!DOCTYPE html><html><head><title>{status}</title></head>\
                     <body><h1>{status}</h1><p>{}</p><a href=\"/\">Back home</a></body></html>",
                    other.public_message()
                );
                (status, Html(body)).into_response()
            }
        }
    }
}

type PageResult = Result<Response, WebError>;

/// `MaybeUser` for pages: a failed session lookup renders the HTML error page.
pub struct PageUser(pub Option<SessionUser>);

#[async_trait]
impl FromRequestParts<AppState> for PageUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        Ok(PageUser(user))
    }
}

fn signed_in(user: &Option<SessionUser>) -> Result<SessionUser, WebError> {
    user.clone().ok_or(WebError(AppError::Unauthorized))
}

/// Errors a form page shows inline instead of failing the request.
fn form_message(e: AppError) -> Result<String, WebError> {
    match e {
        AppError::Validation(_) | AppError::Conflict(_) | AppError::InvalidCredentials => {
            Ok(e.to_string())
        }
        other => Err(other.into()),
    }
}

fn html(state: &AppState, name: &str, ctx: &Context, status: StatusCode) -> PageResult {
    Ok((status, render(state, name, ctx)?).into_response())
}

/// Post form values as the template echoes them back.
#[derive(Serialize)]
struct PostFormView<'a> {
    title: &'a str,
    subtitle: &'a str,
    body: &'a str,
    img_url: &'a str,
}

impl<'a> From<&'a PostInput> for PostFormView<'a> {
    fn from(input: &'a PostInput) -> Self {
        Self {
            title: input.title.as_deref().unwrap_or_default(),
            subtitle: input.subtitle.as_deref().unwrap_or_default(),
            body: input.body.as_deref().unwrap_or_default(),
            img_url: input.img_url.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    pub comment_text: Option<String>,
}

#[instrument(skip(state, user))]
pub async fn index(State(state): State<AppState>, PageUser(user): PageUser) -> PageResult {
    let posts: Vec<PostSummary> = services::list_posts(&state)
        .await?
        .into_iter()
        .map(PostSummary::from)
        .collect();
    let mut ctx = page(&user);
    ctx.insert("posts", &posts);
    html(&state, "index.html", &ctx, StatusCode::OK)
}

async fn post_page(
    state: &AppState,
    user: &Option<SessionUser>,
    id: i64,
    error: Option<String>,
    status: StatusCode,
) -> PageResult {
    let (post, comments) = services::get_post(state, id).await?;
    let mut ctx = page(user);
    ctx.insert("post", &PostDetail::new(post, comments));
    ctx.insert("error", &error);
    html(state, "post.html", &ctx, status)
}

#[instrument(skip(state, user))]
pub async fn show_post(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(id): Path<i64>,
) -> PageResult {
    post_page(&state, &user, id, None, StatusCode::OK).await
}

#[instrument(skip(state, user, form))]
pub async fn comment_on_post(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> PageResult {
    let actor = signed_in(&user)?;
    match services::add_comment(&state, &actor, id, form.comment_text).await {
        Ok(_) => Ok(Redirect::to(&format!("/post/{id}")).into_response()),
        Err(e) => {
            let msg = form_message(e)?;
            post_page(&state, &user, id, Some(msg), StatusCode::BAD_REQUEST).await
        }
    }
}

fn post_form_page(
    state: &AppState,
    user: &Option<SessionUser>,
    edit_id: Option<i64>,
    form: &PostInput,
    error: Option<String>,
    status: StatusCode,
) -> PageResult {
    let mut ctx = page(user);
    ctx.insert("is_edit", &edit_id.is_some());
    ctx.insert("post_id", &edit_id);
    ctx.insert("form", &PostFormView::from(form));
    ctx.insert("error", &error);
    html(state, "make-post.html", &ctx, status)
}

#[instrument(skip(state, user))]
pub async fn new_post_form(State(state): State<AppState>, PageUser(user): PageUser) -> PageResult {
    signed_in(&user)?;
    post_form_page(&state, &user, None, &PostInput::default(), None, StatusCode::OK)
}

#[instrument(skip(state, user, form))]
pub async fn create_post(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Form(form): Form<PostInput>,
) -> PageResult {
    let actor = signed_in(&user)?;
    match services::create_post(&state, &actor, form.clone()).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(e) => {
            let msg = form_message(e)?;
            post_form_page(&state, &user, None, &form, Some(msg), StatusCode::BAD_REQUEST)
        }
    }
}

#[instrument(skip(state, user))]
pub async fn edit_post_form(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(id): Path<i64>,
) -> PageResult {
    let actor = signed_in(&user)?;
    auth_services::require_admin(&actor)?;
    let post = services::find_post(&state, id).await?;
    let form = PostInput {
        title: Some(post.title),
        subtitle: Some(post.subtitle),
        body: Some(post.body),
        img_url: Some(post.img_url),
    };
    post_form_page(&state, &user, Some(id), &form, None, StatusCode::OK)
}

#[instrument(skip(state, user, form))]
pub async fn update_post(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(id): Path<i64>,
    Form(form): Form<PostInput>,
) -> PageResult {
    let actor = signed_in(&user)?;
    match services::edit_post(&state, &actor, id, form.clone()).await {
        Ok(()) => Ok(Redirect::to(&format!("/post/{id}")).into_response()),
        Err(e) => {
            let msg = form_message(e)?;
            post_form_page(&state, &user, Some(id), &form, Some(msg), StatusCode::BAD_REQUEST)
        }
    }
}

#[instrument(skip(state, user))]
pub async fn delete_post(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(id): Path<i64>,
) -> PageResult {
    let actor = signed_in(&user)?;
    services::delete_post(&state, &actor, id).await?;
    Ok(Redirect::to("/").into_response())
}

fn account_page(
    state: &AppState,
    template: &str,
    email: Option<&str>,
    name: Option<&str>,
    error: Option<String>,
    status: StatusCode,
) -> PageResult {
    let mut ctx = page(&None);
    ctx.insert("email", &email.unwrap_or_default());
    ctx.insert("name", &name.unwrap_or_default());
    ctx.insert("error", &error);
    html(state, template, &ctx, status)
}

#[instrument(skip(state))]
pub async fn register_form(State(state): State<AppState>) -> PageResult {
    account_page(&state, "register.html", None, None, None, StatusCode::OK)
}

#[instrument(skip(state, jar, form))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterRequest>,
) -> PageResult {
    let email = form.email.clone();
    let name = form.name.clone();
    match auth_services::register(&state, form).await {
        Ok(user) => {
            let jar = start_session(jar, &state, user.id).map_err(AppError::Internal)?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(AppError::Conflict(_)) => account_page(
            &state,
            "register.html",
            email.as_deref(),
            name.as_deref(),
            Some("You've already signed up with that email, log in instead!".into()),
            StatusCode::BAD_REQUEST,
        ),
        Err(e) => {
            let msg = form_message(e)?;
            account_page(
                &state,
                "register.html",
                email.as_deref(),
                name.as_deref(),
                Some(msg),
                StatusCode::BAD_REQUEST,
            )
        }
    }
}

#[instrument(skip(state))]
pub async fn login_form(State(state): State<AppState>) -> PageResult {
    account_page(&state, "login.html", None, None, None, StatusCode::OK)
}

#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginRequest>,
) -> PageResult {
    let email = form.email.clone();
    match auth_services::login(&state, form).await {
        Ok(user) => {
            let jar = start_session(jar, &state, user.id).map_err(AppError::Internal)?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(e) => {
            let status = e.status();
            let msg = form_message(e)?;
            account_page(&state, "login.html", email.as_deref(), None, Some(msg), status)
        }
    }
}

#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> Response {
    (end_session(jar), Redirect::to("/")).into_response()
}

#[instrument(skip(state, user))]
pub async fn about(State(state): State<AppState>, PageUser(user): PageUser) -> PageResult {
    html(&state, "about.html", &page(&user), StatusCode::OK)
}

fn contact_page(
    state: &AppState,
    user: &Option<SessionUser>,
    sent: bool,
    error: Option<String>,
    status: StatusCode,
) -> PageResult {
    let mut ctx = page(user);
    ctx.insert("msg_sent", &sent);
    ctx.insert("error", &error);
    html(state, "contact.html", &ctx, status)
}

#[instrument(skip(state, user))]
pub async fn contact_form(State(state): State<AppState>, PageUser(user): PageUser) -> PageResult {
    contact_page(&state, &user, false, None, StatusCode::OK)
}

#[instrument(skip(state, user, form))]
pub async fn send_contact(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Form(form): Form<ContactRequest>,
) -> PageResult {
    match contact::submit(&state, form).await {
        Ok(()) => contact_page(&state, &user, true, None, StatusCode::OK),
        Err(e) => {
            let msg = form_message(e)?;
            contact_page(&state, &user, false, Some(msg), StatusCode::BAD_REQUEST)
        }
    }
}
