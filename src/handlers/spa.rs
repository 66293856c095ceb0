//! Serves the built frontend for every path outside `/api`.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

/// Static files from the build directory; unknown paths get `index.html` so
/// client-side routing works.
pub async fn frontend(State(state): State<Arc<AppState>>, req: Request) -> Response {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let dir = &state.config.static_dir;
    let index = dir.join("index.html");
    if !tokio::fs::try_exists(&index).await.unwrap_or(false) {
        return (StatusCode::NOT_FOUND, "Frontend build not found").into_response();
    }

    match ServeDir::new(dir).fallback(ServeFile::new(index)).oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(never) => match never {},
    }
}
