//! HTTP transports: polling, streaming and the two inbound endpoints.
//!
//! DESIGN
//! ======
//! Every outbound handler follows the same shape: validate the path and
//! callback, build a `Transport`, ask the registry for an `Attachment`, and
//! return a body streamed from the transport preamble followed by the
//! attachment's chunks. The session decides when the body ends by releasing
//! the consumer; a client that hangs up drops the body, which drops the
//! attachment and tells the session its peer is gone.
//!
//! ERROR HANDLING
//! ==============
//! Handlers return `Result<Response, Rejection>`. A rejection carries the
//! CORS/cookie headers the response still needs plus the `SockJsError`
//! that renders the status and body.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use super::{NO_CACHE, preflight, session_headers};
use crate::error::SockJsError;
use crate::session::Attachment;
use crate::state::AppState;
use crate::transport::{self, CONTENT_TYPE_PLAIN, Transport, TransportKind};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

// =============================================================================
// EXTRACTION
// =============================================================================

/// `c` query parameter used by the callback transports.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub c: Option<String>,
}

/// `d` form field posted by `jsonp_send`.
#[derive(Debug, Deserialize)]
pub struct JsonpSendForm {
    pub d: Option<String>,
}

/// A failed request: the headers to keep plus the error to render.
pub struct Rejection {
    headers: HeaderMap,
    error: SockJsError,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.headers, self.error).into_response()
    }
}

/// Server and session segments must be non-empty and free of dots.
pub(crate) fn session_key(server: &str, session: &str) -> Option<String> {
    let valid = |segment: &str| !segment.is_empty() && !segment.contains('.');
    (valid(server) && valid(session)).then(|| session.to_string())
}

// =============================================================================
// OUTBOUND
// =============================================================================

pub async fn xhr(state: State<AppState>, path: Path<(String, String)>, headers: HeaderMap) -> Response {
    open_transport(state, path, headers, TransportKind::XhrPolling, None)
}

pub async fn xhr_streaming(state: State<AppState>, path: Path<(String, String)>, headers: HeaderMap) -> Response {
    open_transport(state, path, headers, TransportKind::XhrStreaming, None)
}

pub async fn eventsource(state: State<AppState>, path: Path<(String, String)>, headers: HeaderMap) -> Response {
    open_transport(state, path, headers, TransportKind::EventSource, None)
}

pub async fn htmlfile(
    state: State<AppState>,
    path: Path<(String, String)>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Response {
    open_transport(state, path, headers, TransportKind::HtmlFile, query.c)
}

pub async fn jsonp(
    state: State<AppState>,
    path: Path<(String, String)>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Response {
    open_transport(state, path, headers, TransportKind::JsonpPolling, query.c)
}

fn open_transport(
    State(state): State<AppState>,
    Path((server, session)): Path<(String, String)>,
    headers: HeaderMap,
    kind: TransportKind,
    callback: Option<String>,
) -> Response {
    let Some(key) = session_key(&server, &session) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut response_headers = session_headers(&state.config, &headers);

    let transport = match Transport::new(kind, callback.as_deref()) {
        Ok(transport) => transport,
        Err(error) => return Rejection { headers: response_headers, error }.into_response(),
    };

    debug!(session = %key, transport = kind.name(), "sockjs: outbound request");
    let attachment = state.registry.handle_open_request(&key, transport);

    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(kind.content_type()));
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    let body = streaming_body(transport::preamble(kind, callback.as_deref()), attachment);
    (response_headers, body).into_response()
}

/// Preamble (if any) followed by every chunk the session writes.
fn streaming_body(preamble: Option<String>, attachment: Attachment) -> Body {
    let chunks = futures::stream::iter(preamble)
        .chain(attachment)
        .map(Ok::<String, Infallible>);
    Body::from_stream(chunks)
}

// =============================================================================
// INBOUND
// =============================================================================

pub async fn xhr_send(
    State(state): State<AppState>,
    Path((server, session)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Rejection> {
    let Some(key) = session_key(&server, &session) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let mut response_headers = session_headers(&state.config, &headers);

    let sent = std::str::from_utf8(&body)
        .map_err(|_| SockJsError::InvalidJson)
        .and_then(|payload| state.registry.handle_send_request(&key, payload));
    if let Err(error) = sent {
        return Err(Rejection { headers: response_headers, error });
    }
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PLAIN));
    Ok((StatusCode::NO_CONTENT, response_headers).into_response())
}

/// Accepts the payload either as the `d` field of a urlencoded form or as the
/// raw request body.
pub async fn jsonp_send(
    State(state): State<AppState>,
    Path((server, session)): Path<(String, String)>,
    request: Request,
) -> Result<Response, Rejection> {
    let Some(key) = session_key(&server, &session) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let mut response_headers = session_headers(&state.config, request.headers());

    let payload = read_jsonp_payload(request, &state).await;
    if let Err(error) = state.registry.handle_send_request(&key, &payload) {
        return Err(Rejection { headers: response_headers, error });
    }
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PLAIN));
    Ok((response_headers, "ok").into_response())
}

/// An unreadable body is treated as an empty one.
async fn read_jsonp_payload(request: Request, state: &AppState) -> String {
    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(FORM_URLENCODED));

    if is_form {
        Form::<JsonpSendForm>::from_request(request, state)
            .await
            .ok()
            .and_then(|Form(form)| form.d)
            .unwrap_or_default()
    } else {
        String::from_request(request, state).await.unwrap_or_default()
    }
}

// =============================================================================
// PREFLIGHT
// =============================================================================

pub async fn xhr_options(State(state): State<AppState>, headers: HeaderMap) -> Response {
    preflight(&state.config, &headers, "OPTIONS, POST")
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
