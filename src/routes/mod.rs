//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the SockJS URL layout for one application. Every
//! application gets the same static route table, built by `sockjs_router`
//! and mounted under its prefix with `mount`:
//!
//! ```text
//!   P/                              welcome banner
//!   P/info                          capability probe
//!   P/iframe*.html                  iframe bootstrap page
//!   P/websocket                     raw websocket
//!   P/{server}/{session}/{transport}
//! ```
//!
//! The header helpers at the bottom are shared by every handler: CORS echo,
//! `JSESSIONID` echo, and the long-lived cache headers for preflights.

pub mod http;
pub mod info;
pub mod ws;

use axum::Router;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, ALLOW, CACHE_CONTROL,
    EXPIRES, ORIGIN, SET_COOKIE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::registry::Hooks;
use crate::state::AppState;

pub const COOKIE_NAME: &str = "JSESSIONID";
pub const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";
const ONE_YEAR_SECS: i64 = 31_536_000;
const PREFLIGHT_MAX_AGE: &str = "1000001";

// =============================================================================
// ROUTER
// =============================================================================

/// The SockJS route table for one application, relative to its prefix.
pub fn sockjs_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(info::welcome))
        .route("/info", get(info::info).options(info::info_options))
        .route("/websocket", get(ws::handle_raw_websocket))
        .route("/{file}", get(info::iframe))
        .route("/{server}/{session}/xhr", post(http::xhr).options(http::xhr_options))
        .route("/{server}/{session}/xhr_send", post(http::xhr_send).options(http::xhr_options))
        .route(
            "/{server}/{session}/xhr_streaming",
            post(http::xhr_streaming).options(http::xhr_options),
        )
        .route("/{server}/{session}/eventsource", get(http::eventsource))
        .route("/{server}/{session}/htmlfile", get(http::htmlfile))
        .route("/{server}/{session}/jsonp", get(http::jsonp))
        .route("/{server}/{session}/jsonp_send", post(http::jsonp_send))
        .route("/{server}/{session}/websocket", get(ws::handle_websocket))
        .with_state(state)
}

/// Mount one application under `prefix` (for example `/echo`). An empty or
/// `/` prefix serves it from the root.
pub fn mount(router: Router, prefix: &str, config: ServerConfig, hooks: Hooks) -> Router {
    let state = AppState::new(config, hooks);
    tracing::info!(%prefix, websocket = state.config.websocket, "sockjs: mounting application");
    match prefix.trim_end_matches('/') {
        "" => router.merge(sockjs_router(state)),
        prefix => router.nest(prefix, sockjs_router(state)),
    }
}

/// Wrap the assembled router with request tracing.
pub fn app(router: Router) -> Router {
    router.layer(TraceLayer::new_for_http())
}

// =============================================================================
// SHARED HEADERS
// =============================================================================

/// `Origin` echo plus credentials, and the `JSESSIONID` echo when enabled.
pub(crate) fn session_headers(config: &ServerConfig, request: &HeaderMap) -> HeaderMap {
    let mut headers = cors_headers(request);
    if config.cookie_needed {
        let jar = CookieJar::from_headers(request);
        let value = jar.get(COOKIE_NAME).map_or("dummy", Cookie::value);
        let cookie = Cookie::build((COOKIE_NAME, value)).path("/").build();
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            headers.insert(SET_COOKIE, value);
        }
    }
    headers
}

fn cors_headers(request: &HeaderMap) -> HeaderMap {
    let origin = request
        .get(ORIGIN)
        .filter(|origin| !origin.is_empty() && origin.as_bytes() != b"null")
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    if let Some(requested) = request.get(ACCESS_CONTROL_REQUEST_HEADERS) {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
    }
    headers
}

/// Answer a CORS preflight for an endpoint accepting `methods`.
pub(crate) fn preflight(config: &ServerConfig, request: &HeaderMap, methods: &'static str) -> Response {
    let mut headers = session_headers(config, request);
    headers.insert(ALLOW, HeaderValue::from_static(methods));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(methods));
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE));
    insert_long_cache(&mut headers);
    (StatusCode::NO_CONTENT, headers).into_response()
}

/// `Cache-Control` and `Expires` one year out.
pub(crate) fn insert_long_cache(headers: &mut HeaderMap) {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=31536000"));
    let expires = OffsetDateTime::now_utc() + time::Duration::seconds(ONE_YEAR_SECS);
    if let Some(value) = expires
        .format(&Rfc2822)
        .ok()
        .and_then(|value| HeaderValue::from_str(&value).ok())
    {
        headers.insert(EXPIRES, value);
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
