//! Drives the full router in-process, carrying cookies between requests like a browser.

use std::collections::HashMap;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    app::build_app,
    auth::csrf::{CSRF_COOKIE, CSRF_HEADER},
    state::AppState,
};

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }
}

pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
    /// Fetch and echo a CSRF token on state-changing `/api` calls, like the SPA does.
    auto_csrf: bool,
}

impl TestClient {
    pub fn new() -> Self {
        Self::with_state(AppState::fake())
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            app: build_app(state),
            cookies: HashMap::new(),
            auto_csrf: true,
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn disable_csrf(&mut self) {
        self.auto_csrf = false;
    }

    async fn request(&mut self, method: Method, uri: &str) -> axum::http::request::Builder {
        let mutating = ![Method::GET, Method::HEAD, Method::OPTIONS].contains(&method);
        let csrf = if self.auto_csrf && mutating && uri.starts_with("/api/") {
            if !self.cookies.contains_key(CSRF_COOKIE) {
                let req = self.cookie_request(Method::GET, "/api/csrf-token");
                self.exchange(req.body(Body::empty()).unwrap()).await;
            }
            self.cookies.get(CSRF_COOKIE).cloned()
        } else {
            None
        };
        let builder = self.cookie_request(method, uri);
        match csrf {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        }
    }

    fn cookie_request(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn exchange(&mut self, req: Request<Body>) -> TestResponse {
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        for raw in headers.get_all(header::SET_COOKIE) {
            let raw = raw.to_str().unwrap();
            let pair = raw.split(';').next().unwrap_or_default();
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let expired = raw.to_ascii_lowercase().contains("max-age=0");
            if value.is_empty() || expired {
                self.cookies.remove(name.trim());
            } else {
                self.cookies.insert(name.trim().into(), value.trim().into());
            }
        }
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let req = self.request(Method::GET, uri).await.body(Body::empty()).unwrap();
        self.exchange(req).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        let req = self.request(Method::DELETE, uri).await.body(Body::empty()).unwrap();
        self.exchange(req).await
    }

    pub async fn post_empty(&mut self, uri: &str) -> TestResponse {
        let req = self.request(Method::POST, uri).await.body(Body::empty()).unwrap();
        self.exchange(req).await
    }

    pub async fn json(&mut self, method: Method, uri: &str, body: &Value) -> TestResponse {
        let req = self
            .request(method, uri)
            .await
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        self.exchange(req).await
    }

    /// Sends `body` verbatim as JSON, e.g. to exercise malformed input.
    pub async fn raw(&mut self, method: Method, uri: &str, body: &str) -> TestResponse {
        let req = self
            .request(method, uri)
            .await
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.exchange(req).await
    }

    /// JSON call with an explicit CSRF header instead of the automatic one.
    pub async fn json_with_csrf(
        &mut self,
        method: Method,
        uri: &str,
        body: &Value,
        token: &str,
    ) -> TestResponse {
        let req = self
            .cookie_request(method, uri)
            .header(CSRF_HEADER, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        self.exchange(req).await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.json(Method::POST, uri, body).await
    }

    /// Form values must already be URL-safe.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let encoded = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let req = self
            .request(Method::POST, uri)
            .await
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(encoded))
            .unwrap();
        self.exchange(req).await
    }

    /// Registers through the JSON API; the client stays logged in as that user.
    pub async fn register(&mut self, email: &str, name: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/register",
            &serde_json::json!({ "email": email, "name": name, "password": password }),
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/login",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn logout(&mut self) -> TestResponse {
        self.post_empty("/api/logout").await
    }

    /// Creates a post as the current user and returns its id.
    pub async fn create_post(&mut self, title: &str) -> i64 {
        let res = self
            .post_json(
                "/api/posts",
                &serde_json::json!({
                    "title": title,
                    "subtitle": "A subtitle",
                    "body": "<p>Body</p>",
                    "img_url": "https://example.com/cover.jpg",
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
        res.json()["id"].as_i64().unwrap()
    }
}
