//! Registry: the sessions of one mounted application.
//!
//! DESIGN
//! ======
//! `Registry` lives in the `AppState` of one mount point and owns every
//! `Session` created under it. The application's hooks are
//! fixed at construction and handed to each session it creates.
//!
//! Eviction is lazy: each lookup first sweeps out sessions whose close grace
//! period has elapsed. There is no background sweeper, so cleanup never races
//! with request handling.
//!
//! The boundary operations (`handle_*`, `notify_peer_closed`) are what the
//! HTTP layer calls; they never block on I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::SessionConfig;
use crate::error::SockJsError;
use crate::session::{Attachment, Session};
use crate::transport::Transport;

// =============================================================================
// HOOKS
// =============================================================================

pub type OpenHook = Arc<dyn Fn(&Session) + Send + Sync>;
pub type MessageHook = Arc<dyn Fn(&Session, String) + Send + Sync>;

/// Application callbacks. At most one of each per mounted application.
#[derive(Clone, Default)]
pub struct Hooks {
    pub(crate) on_open: Option<OpenHook>,
    pub(crate) on_message: Option<MessageHook>,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs once per session, the first time a consumer attaches.
    #[must_use]
    pub fn on_open(mut self, hook: impl Fn(&Session) + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(hook));
        self
    }

    /// Runs once per inbound message, in arrival order.
    #[must_use]
    pub fn on_message(mut self, hook: impl Fn(&Session, String) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(hook));
        self
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Cheap to clone; all state is behind one `Arc`.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    sessions: Mutex<HashMap<String, Session>>,
    hooks: Hooks,
    config: SessionConfig,
}

impl Registry {
    #[must_use]
    pub fn new(config: SessionConfig, hooks: Hooks) -> Self {
        Self {
            inner: Arc::new(RegistryInner { sessions: Mutex::new(HashMap::new()), hooks, config }),
        }
    }

    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.inner.config
    }

    /// The live session under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Session> {
        self.sessions().get(key).cloned()
    }

    /// The session under `key`, created detached if absent.
    pub fn create(&self, key: &str) -> Session {
        self.sessions()
            .entry(key.to_string())
            .or_insert_with(|| Session::new(key, self.inner.config, self.inner.hooks.clone()))
            .clone()
    }

    /// Number of sessions still held (after sweeping).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the session table, evicting sessions whose grace period elapsed.
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        let mut sessions = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|key, session| {
            let keep = !session.is_evictable();
            if !keep {
                debug!(session = %key, "sockjs: evicting closed session");
            }
            keep
        });
        sessions
    }
}

// =============================================================================
// BOUNDARY OPERATIONS
// =============================================================================

impl Registry {
    /// Open (or continue) a session on a transport that may create it.
    ///
    /// The attachment's first chunk is the open frame for a new session, the
    /// queued messages for a known one, or a close frame if it is unavailable.
    pub fn handle_open_request(&self, key: &str, transport: Transport) -> Attachment {
        self.create(key).attach_consumer(transport)
    }

    /// Attach to an existing session.
    ///
    /// # Errors
    ///
    /// `NotOpen` when no session exists under `key`.
    pub fn handle_poll_request(&self, key: &str, transport: Transport) -> Result<Attachment, SockJsError> {
        let session = self.get(key).ok_or(SockJsError::NotOpen)?;
        Ok(session.attach_consumer(transport))
    }

    /// Deliver an inbound payload to an existing session.
    ///
    /// # Errors
    ///
    /// `NotOpen` for an unknown or closed session, `PayloadExpected` for an
    /// empty body, `InvalidJson` for a malformed one.
    pub fn handle_send_request(&self, key: &str, payload: &str) -> Result<(), SockJsError> {
        let session = self.get(key).ok_or(SockJsError::NotOpen)?;
        if payload.is_empty() {
            return Err(SockJsError::PayloadExpected);
        }
        session.receive_message(payload)
    }

    /// The HTTP layer saw the physical connection for `key` go away.
    pub fn notify_peer_closed(&self, key: &str) {
        if let Some(session) = self.get(key) {
            session.peer_closed();
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
