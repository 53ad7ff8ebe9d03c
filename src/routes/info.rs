//! Session-less endpoints: welcome banner, `/info` probe, iframe page.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{NO_CACHE, insert_long_cache, preflight, session_headers};
use crate::transport::{CONTENT_TYPE_HTML, CONTENT_TYPE_PLAIN};
use crate::state::AppState;

pub const WELCOME: &str = "Welcome to SockJS!\n";

/// Body of `GET /info`.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub websocket: bool,
    pub origins: Vec<&'static str>,
    pub cookie_needed: bool,
    pub entropy: u32,
}

pub async fn welcome() -> Response {
    ([(CONTENT_TYPE, CONTENT_TYPE_PLAIN)], WELCOME).into_response()
}

pub async fn info(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let body = InfoResponse {
        websocket: state.config.websocket,
        origins: vec!["*:*"],
        cookie_needed: state.config.cookie_needed,
        entropy: rand::random(),
    };
    let mut response_headers = session_headers(&state.config, &headers);
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    (response_headers, Json(body)).into_response()
}

pub async fn info_options(State(state): State<AppState>, headers: HeaderMap) -> Response {
    preflight(&state.config, &headers, "OPTIONS, GET")
}

// =============================================================================
// IFRAME
// =============================================================================

/// Serve the iframe bootstrap page for any `iframe*.html` path.
///
/// The page only depends on the client URL, so its hash is a stable ETag and
/// a matching `If-None-Match` is answered with 304.
pub async fn iframe(State(state): State<AppState>, Path(file): Path<String>, headers: HeaderMap) -> Response {
    if !is_iframe_path(&file) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let page = iframe_page(&state.config.sockjs_url);
    let etag = format!("\"{}\"", page_digest(&page));
    let mut response_headers = HeaderMap::new();
    insert_long_cache(&mut response_headers);
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response_headers.insert(ETAG, value);
    }

    let cached = headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == etag);
    if cached {
        return (StatusCode::NOT_MODIFIED, response_headers).into_response();
    }

    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_HTML));
    (response_headers, page).into_response()
}

fn is_iframe_path(file: &str) -> bool {
    file.starts_with("iframe")
        && (file.ends_with(".html") || file.ends_with(".htm"))
}

#[must_use]
pub fn iframe_page(sockjs_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta http-equiv="X-UA-Compatible" content="IE=edge" />
  <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
  <script>
    document.domain = document.domain;
    _sockjs_onload = function(){{SockJS.bootstrap_iframe();}};
  </script>
  <script src="{sockjs_url}"></script>
</head>
<body>
  <h2>Don't panic!</h2>
  <p>This is a SockJS hidden iframe. It's used for cross domain magic.</p>
</body>
</html>"#
    )
}

fn page_digest(page: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page.as_bytes());
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

#[cfg(test)]
#[path = "info_test.rs"]
mod tests;
