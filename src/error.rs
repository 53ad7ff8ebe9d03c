//! Errors surfaced to HTTP clients.
//!
//! ERROR HANDLING
//! ==============
//! Only failures a client can cause live here. Consumer write failures,
//! rejected attaches and timer hiccups are protocol outcomes handled inside
//! the session and never reach this type.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

/// Grepable error code and HTTP status for a client-facing error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SockJsError {
    #[error("Broken JSON encoding.")]
    InvalidJson,
    #[error("Payload expected.")]
    PayloadExpected,
    #[error("Session is not open!")]
    NotOpen,
    #[error("\"callback\" parameter required")]
    CallbackRequired,
    #[error("invalid \"callback\" parameter")]
    InvalidCallback,
    #[error("WebSockets Are Disabled")]
    WebSocketDisabled,
    #[error("Can \"Upgrade\" only to \"WebSocket\".")]
    BadUpgrade,
}

impl ErrorCode for SockJsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "E_INVALID_JSON",
            Self::PayloadExpected => "E_PAYLOAD_EXPECTED",
            Self::NotOpen => "E_SESSION_NOT_OPEN",
            Self::CallbackRequired => "E_CALLBACK_REQUIRED",
            Self::InvalidCallback => "E_INVALID_CALLBACK",
            Self::WebSocketDisabled => "E_WEBSOCKET_DISABLED",
            Self::BadUpgrade => "E_BAD_UPGRADE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::PayloadExpected | Self::CallbackRequired | Self::InvalidCallback => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotOpen | Self::WebSocketDisabled => StatusCode::NOT_FOUND,
            Self::BadUpgrade => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for SockJsError {
    fn into_response(self) -> Response {
        tracing::debug!(code = self.error_code(), message = %self, "sockjs: request rejected");
        (self.status(), [(CONTENT_TYPE, "text/plain; charset=UTF-8")], self.to_string()).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
