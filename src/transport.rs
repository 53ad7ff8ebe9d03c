//! Transport descriptors: how each wire protocol binds to a session.
//!
//! DESIGN
//! ======
//! A transport is data, not behavior: it names the framing a consumer uses,
//! whether the response ends after one frame (polling) or keeps streaming,
//! and what a vanished peer means for the session. The HTTP handlers in
//! `routes` pick a `TransportKind` from the static route table, build a
//! `Transport`, and hand it to `Session::attach_consumer`.

use crate::error::SockJsError;
use crate::frame::Framing;

/// Bytes of `h` written ahead of an xhr streaming response (IE needs 2 KiB).
pub const XHR_STREAMING_PREAMBLE_LEN: usize = 2048;

/// The htmlfile bootstrap page is padded to this many bytes.
const HTMLFILE_PADDED_LEN: usize = 1024;

const HTMLFILE_PREFIX: &str = r#"<!doctype html>
<html><head>
  <meta http-equiv="X-UA-Compatible" content="IE=edge" />
  <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
</head><body><h2>Don't panic!</h2>
  <script>
    document.domain = document.domain;
    var c = parent."#;

const HTMLFILE_POSTFIX: &str = r";
    c.start();
    function p(d) {c.message(d);};
    window.onload = function() {c.stop();};
  </script>";

pub const CONTENT_TYPE_JAVASCRIPT: &str = "application/javascript; charset=UTF-8";
pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream; charset=UTF-8";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=UTF-8";
pub const CONTENT_TYPE_PLAIN: &str = "text/plain; charset=UTF-8";

// =============================================================================
// TYPES
// =============================================================================

/// How long a consumer stays bound to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The response ends after the first frame written to it.
    Polling,
    /// The response stays open. With `budgeted`, it is recycled once it has
    /// carried the configured response limit.
    Streaming { budgeted: bool },
}

/// What losing the physical peer does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerGone {
    /// Release the consumer; the client is expected to reconnect.
    Detach,
    /// End the conversation with `1002 Connection interrupted`.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    XhrPolling,
    XhrStreaming,
    EventSource,
    HtmlFile,
    JsonpPolling,
    WebSocket,
    RawWebSocket,
}

impl TransportKind {
    /// Path segment the transport is routed under.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::XhrPolling => "xhr",
            Self::XhrStreaming => "xhr_streaming",
            Self::EventSource => "eventsource",
            Self::HtmlFile => "htmlfile",
            Self::JsonpPolling => "jsonp",
            Self::WebSocket | Self::RawWebSocket => "websocket",
        }
    }

    #[must_use]
    pub fn delivery(self) -> Delivery {
        match self {
            Self::XhrPolling | Self::JsonpPolling => Delivery::Polling,
            Self::XhrStreaming | Self::EventSource | Self::HtmlFile => Delivery::Streaming { budgeted: true },
            Self::WebSocket | Self::RawWebSocket => Delivery::Streaming { budgeted: false },
        }
    }

    #[must_use]
    pub fn on_peer_gone(self) -> PeerGone {
        match self {
            Self::WebSocket | Self::RawWebSocket => PeerGone::Close,
            _ => PeerGone::Detach,
        }
    }

    /// Whether the transport requires a `c` (callback) query parameter.
    #[must_use]
    pub fn needs_callback(self) -> bool {
        matches!(self, Self::HtmlFile | Self::JsonpPolling)
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::XhrPolling | Self::XhrStreaming | Self::JsonpPolling => CONTENT_TYPE_JAVASCRIPT,
            Self::EventSource => CONTENT_TYPE_EVENT_STREAM,
            Self::HtmlFile => CONTENT_TYPE_HTML,
            Self::WebSocket | Self::RawWebSocket => CONTENT_TYPE_PLAIN,
        }
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// A transport kind bound to the framing one request asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    kind: TransportKind,
    framing: Framing,
}

impl Transport {
    /// Build the transport for one request.
    ///
    /// # Errors
    ///
    /// `CallbackRequired` / `InvalidCallback` when a callback transport gets
    /// a missing or unsafe `c` parameter.
    pub fn new(kind: TransportKind, callback: Option<&str>) -> Result<Self, SockJsError> {
        let framing = match kind {
            TransportKind::XhrPolling | TransportKind::XhrStreaming => Framing::Line,
            TransportKind::EventSource => Framing::EventSource,
            TransportKind::HtmlFile => {
                validate_callback(callback)?;
                Framing::HtmlFile
            }
            TransportKind::JsonpPolling => Framing::Jsonp(validate_callback(callback)?.to_string()),
            TransportKind::WebSocket => Framing::WebSocket,
            TransportKind::RawWebSocket => Framing::Raw,
        };
        Ok(Self { kind, framing })
    }

    #[must_use]
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    #[must_use]
    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    #[must_use]
    pub fn delivery(&self) -> Delivery {
        self.kind.delivery()
    }

    #[must_use]
    pub fn on_peer_gone(&self) -> PeerGone {
        self.kind.on_peer_gone()
    }
}

// =============================================================================
// PREAMBLES
// =============================================================================

/// Bytes written before any frame on a streaming response.
///
/// `callback` must already be validated for `HtmlFile`.
#[must_use]
pub fn preamble(kind: TransportKind, callback: Option<&str>) -> Option<String> {
    match kind {
        TransportKind::XhrStreaming => Some(format!("{}\n", "h".repeat(XHR_STREAMING_PREAMBLE_LEN))),
        // Opera needs two extra newlines before the first event.
        TransportKind::EventSource => Some("\r\n".to_string()),
        TransportKind::HtmlFile => Some(htmlfile_prelude(callback.unwrap_or_default())),
        _ => None,
    }
}

fn htmlfile_prelude(callback: &str) -> String {
    let mut page = format!("{HTMLFILE_PREFIX}{callback}{HTMLFILE_POSTFIX}");
    let padding = HTMLFILE_PADDED_LEN.saturating_sub(page.len());
    page.push_str(&" ".repeat(padding));
    page.push_str("\r\n\r\n");
    page
}

// =============================================================================
// HELPERS
// =============================================================================

/// Accept only callback names that are safe to splice into a script.
///
/// # Errors
///
/// `CallbackRequired` when absent or empty, `InvalidCallback` otherwise.
pub fn validate_callback(callback: Option<&str>) -> Result<&str, SockJsError> {
    let callback = callback.unwrap_or_default();
    if callback.is_empty() {
        return Err(SockJsError::CallbackRequired);
    }
    if !callback
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(SockJsError::InvalidCallback);
    }
    Ok(callback)
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
