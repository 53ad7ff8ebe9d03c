//! Frame: the four protocol frames and their per-transport wire encodings.
//!
//! ARCHITECTURE
//! ============
//! Every byte a session writes to a consumer is a `Frame`. The canonical form
//! is a one-character discriminator optionally followed by JSON:
//!
//! - `o`                       open
//! - `h`                       heartbeat
//! - `a["m1","m2"]`            message array
//! - `c[3000,"Go away!"]`      close
//!
//! Transports never build strings by hand. They pick a `Framing`, and the
//! session runs every frame through it before writing to the sink.
//!
//! DESIGN
//! ======
//! Encoding is pure and deterministic: the same frame and framing always
//! produce the same bytes. Frames are values, so an absent frame cannot reach
//! the encoder.

use std::fmt;

use serde_json::Value;

// =============================================================================
// CLOSE STATUS
// =============================================================================

/// Code used when a session is closed without an explicit status.
pub const DEFAULT_CLOSE_CODE: u16 = 3000;

/// Reason used when a session is closed without an explicit status.
pub const DEFAULT_CLOSE_REASON: &str = "Go away!";

/// Sent to a consumer that tries to attach while another one is bound.
pub const ANOTHER_CONNECTION_CODE: u16 = 2010;
pub const ANOTHER_CONNECTION_REASON: &str = "Another connection still open";

/// Used when the physical peer vanishes from a transport that cannot reattach.
pub const INTERRUPTED_CODE: u16 = 1002;
pub const INTERRUPTED_REASON: &str = "Connection interrupted";

/// Status and human-readable reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseStatus {
    pub code: u16,
    pub reason: String,
}

impl CloseStatus {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into() }
    }

    #[must_use]
    pub fn another_connection() -> Self {
        Self::new(ANOTHER_CONNECTION_CODE, ANOTHER_CONNECTION_REASON)
    }

    #[must_use]
    pub fn interrupted() -> Self {
        Self::new(INTERRUPTED_CODE, INTERRUPTED_REASON)
    }
}

impl Default for CloseStatus {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSE_CODE, DEFAULT_CLOSE_REASON)
    }
}

// =============================================================================
// FRAME
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Open,
    Heartbeat,
    Messages(Vec<String>),
    Close(CloseStatus),
}

impl Frame {
    /// The single-character discriminator that starts the canonical form.
    #[must_use]
    pub fn discriminator(&self) -> char {
        match self {
            Self::Open => 'o',
            Self::Heartbeat => 'h',
            Self::Messages(_) => 'a',
            Self::Close(_) => 'c',
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open | Self::Heartbeat => write!(f, "{}", self.discriminator()),
            Self::Messages(messages) => {
                let array = Value::Array(messages.iter().cloned().map(Value::String).collect());
                write!(f, "a{array}")
            }
            Self::Close(status) => {
                let array = Value::Array(vec![Value::from(status.code), Value::String(status.reason.clone())]);
                write!(f, "c{array}")
            }
        }
    }
}

// =============================================================================
// FRAMING
// =============================================================================

/// Transport-specific wrapping applied on top of the canonical frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Canonical frame followed by `\n` (xhr polling and streaming).
    Line,
    /// Canonical frame as-is, one websocket text message per frame.
    WebSocket,
    /// `data: <frame>\r\n\r\n`.
    EventSource,
    /// Frame embedded as a JS string literal inside a `<script>` block.
    HtmlFile,
    /// Frame passed as a JS string literal to the named callback.
    Jsonp(String),
    /// No protocol framing: each message is delivered bare, other frames vanish.
    Raw,
}

impl Framing {
    /// Render one frame into the chunks written to the sink, in order.
    ///
    /// Most framings produce exactly one chunk. `Raw` produces one chunk per
    /// message and nothing for open, heartbeat and close frames.
    #[must_use]
    pub fn encode(&self, frame: &Frame) -> Vec<String> {
        match self {
            Self::Line => vec![format!("{frame}\n")],
            Self::WebSocket => vec![frame.to_string()],
            Self::EventSource => vec![format!("data: {frame}\r\n\r\n")],
            Self::HtmlFile => vec![format!("<script>\np({});\n</script>\r\n", js_string(frame))],
            Self::Jsonp(callback) => vec![format!("{callback}({});\r\n", js_string(frame))],
            Self::Raw => match frame {
                Frame::Messages(messages) => messages.clone(),
                Frame::Open | Frame::Heartbeat | Frame::Close(_) => Vec::new(),
            },
        }
    }
}

/// The canonical frame JSON-encoded a second time, for embedding in a script.
fn js_string(frame: &Frame) -> String {
    Value::String(frame.to_string()).to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
