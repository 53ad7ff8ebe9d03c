//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! One `AppState` exists per mounted SockJS application: it pairs that
//! application's session registry with the server options the transports
//! consult (websocket toggle, cookie echo, iframe client URL).

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::registry::{Hooks, Registry};

/// Clone is required by Axum; the registry and config are both shared.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, hooks: Hooks) -> Self {
        Self { registry: Registry::new(config.session, hooks), config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::time::Duration;

    use super::*;
    use crate::config::SessionConfig;

    /// Fast timers so end-to-end tests do not wait on production defaults.
    #[must_use]
    pub fn test_config() -> ServerConfig {
        ServerConfig {
            session: SessionConfig {
                disconnect_delay: Duration::from_millis(500),
                heartbeat_interval: Duration::from_secs(25),
                response_limit: 4096,
            },
            ..ServerConfig::default()
        }
    }

    /// Echo every inbound message back to the same session.
    #[must_use]
    pub fn echo_hooks() -> Hooks {
        Hooks::new().on_message(|session, message| session.send([message]))
    }

    #[must_use]
    pub fn echo_state() -> AppState {
        AppState::new(test_config(), echo_hooks())
    }

    /// Serve `/echo` from `state` on an ephemeral port; returns the base URL
    /// without a scheme, e.g. `127.0.0.1:41234/echo`.
    pub async fn spawn_echo(state: AppState) -> String {
        let app = axum::Router::new().nest("/echo", crate::routes::sockjs_router(state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });
        format!("{addr}/echo")
    }
}
