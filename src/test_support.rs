//! In-process harness for driving the router in tests.

use std::{path::PathBuf, sync::Arc};

use axum::{
    body::{Body, Bytes},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, Request, StatusCode,
    },
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{
    config::{AppConfig, OpenAiConfig},
    AppState,
};

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    dir: TempDir,
}

impl TestApp {
    /// App over a fresh data directory with AI reports disabled.
    pub async fn new() -> Self {
        Self::with_openai(OpenAiConfig {
            api_key: None,
            api_url: "http://127.0.0.1:9/v1/chat/completions".into(),
            model: "test-model".into(),
            timeout_secs: 5,
        })
        .await
    }

    pub async fn with_openai(openai: OpenAiConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            data_dir: dir.path().join("data"),
            static_dir: dir.path().join("dist"),
            jwt_secret: "test-secret".into(),
            session_duration_hours: 24,
            openai,
        };
        std::fs::create_dir_all(&config.static_dir).unwrap();

        let state = Arc::new(AppState::new(config).await.unwrap());
        let router = crate::app(state.clone());
        Self { state, router, dir }
    }

    /// A valid bearer token for the default account.
    pub fn token(&self) -> String {
        self.state.tokens.issue("admin").unwrap()
    }

    pub fn static_dir(&self) -> PathBuf {
        self.dir.path().join("dist")
    }
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let (status, _, bytes) = call(router, request).await;
    (status, bytes)
}

/// Run a prebuilt request, keeping the response headers.
pub async fn call(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes)
}

pub fn body_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}
