//! Server and session configuration parsed from environment variables.
//!
//! Every knob has a typed default. `from_lookup` takes any key lookup so
//! tests can build configs without touching the process environment.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_DISCONNECT_DELAY_MS: u64 = 5_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 25_000;
pub const DEFAULT_RESPONSE_LIMIT: usize = 128_000;
pub const DEFAULT_SOCKJS_URL: &str = "https://cdn.jsdelivr.net/npm/sockjs-client@1/dist/sockjs.min.js";

/// Per-session timing and buffering limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a session survives without a consumer, and how long a closed
    /// session lingers before eviction.
    pub disconnect_delay: Duration,
    /// Interval between heartbeat frames while a consumer is attached.
    pub heartbeat_interval: Duration,
    /// Bytes a single streaming response may carry before it is recycled.
    pub response_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            disconnect_delay: Duration::from_millis(DEFAULT_DISCONNECT_DELAY_MS),
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            response_limit: DEFAULT_RESPONSE_LIMIT,
        }
    }
}

/// Options for one mounted application plus process-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Whether the websocket transports are offered.
    pub websocket: bool,
    /// Advertised in `/info`; also controls the `JSESSIONID` cookie echo.
    pub cookie_needed: bool,
    /// Client library loaded by the iframe bootstrap page.
    pub sockjs_url: String,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            websocket: true,
            cookie_needed: true,
            sockjs_url: DEFAULT_SOCKJS_URL.to_string(),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 8081
    /// - `SOCKJS_DISCONNECT_DELAY_MS`: default 5000
    /// - `SOCKJS_HEARTBEAT_INTERVAL_MS`: default 25000
    /// - `SOCKJS_RESPONSE_LIMIT`: default 128000
    /// - `SOCKJS_WEBSOCKET`: default true
    /// - `SOCKJS_COOKIE_NEEDED`: default true
    /// - `SOCKJS_URL`: client library URL for the iframe page
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let disconnect_ms = parse_or(&lookup, "SOCKJS_DISCONNECT_DELAY_MS", DEFAULT_DISCONNECT_DELAY_MS);
        let heartbeat_ms = parse_or(&lookup, "SOCKJS_HEARTBEAT_INTERVAL_MS", DEFAULT_HEARTBEAT_INTERVAL_MS);

        Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            websocket: bool_or(&lookup, "SOCKJS_WEBSOCKET", true),
            cookie_needed: bool_or(&lookup, "SOCKJS_COOKIE_NEEDED", true),
            sockjs_url: lookup("SOCKJS_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SOCKJS_URL.to_string()),
            session: SessionConfig {
                disconnect_delay: Duration::from_millis(disconnect_ms),
                heartbeat_interval: Duration::from_millis(heartbeat_ms.max(1)),
                response_limit: parse_or(&lookup, "SOCKJS_RESPONSE_LIMIT", DEFAULT_RESPONSE_LIMIT),
            },
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn bool_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
