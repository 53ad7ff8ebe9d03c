//! Session: one logical conversation that outlives its HTTP requests.
//!
//! ARCHITECTURE
//! ============
//! A session is an explicit three-state machine:
//!
//! ```text
//!   Detached ──attach──▶ Attached ──detach──▶ Detached
//!      │                    │
//!      └──────close─────────┴──────close──────▶ Closed (terminal)
//! ```
//!
//! A *consumer* is the ephemeral binding of one physical response (an
//! unbounded channel feeding the response body) to the session. Every request
//! builds a fresh consumer; at most one is bound at a time. Polling
//! transports detach after each frame, streaming transports stay bound until
//! their byte budget runs out or the peer goes away.
//!
//! CONCURRENCY
//! ===========
//! All state lives behind one `std::sync::Mutex`, never held across an await.
//! Timers re-enter through a weak handle and re-check their token under that
//! lock. User hooks run *outside* the state lock (so they may call `send` or
//! `close`) but inside a second dispatch lock, which keeps inbound messages
//! and the open hook in a single total order per session.
//!
//! The session only ever holds the sending half of a consumer channel.
//! Detaching drops it, which ends the HTTP response; nothing in here can
//! write to a response after it was released.

use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::SockJsError;
use crate::frame::{CloseStatus, Frame};
use crate::registry::Hooks;
use crate::timer::{TimerName, TimerToken, Timers};
use crate::transport::{Delivery, PeerGone, Transport};

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// TYPES
// =============================================================================

/// Observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Detached,
    Attached,
    Closed,
}

struct Consumer {
    id: u64,
    transport: Transport,
    sink: mpsc::UnboundedSender<String>,
}

impl Consumer {
    /// Encode and push one frame. Returns the bytes written.
    fn write(&self, frame: &Frame) -> Result<usize, PeerGone> {
        let mut written = 0;
        for chunk in self.transport.framing().encode(frame) {
            written += chunk.len();
            self.sink
                .send(chunk)
                .map_err(|_| self.transport.on_peer_gone())?;
        }
        Ok(written)
    }
}

enum State {
    Detached,
    Attached(Consumer),
    Closed,
}

impl State {
    fn phase(&self) -> SessionPhase {
        match self {
            Self::Detached => SessionPhase::Detached,
            Self::Attached(_) => SessionPhase::Attached,
            Self::Closed => SessionPhase::Closed,
        }
    }
}

struct Inner {
    state: State,
    /// Whether the open frame has been written to some consumer.
    opened: bool,
    outbox: Vec<String>,
    inbox: Vec<String>,
    close_status: Option<CloseStatus>,
    /// Bytes written to the current consumer.
    total_sent_bytes: usize,
    timers: Timers,
    /// Set once the close grace period has elapsed.
    evictable: bool,
}

struct Shared {
    key: String,
    config: SessionConfig,
    hooks: Hooks,
    inner: Mutex<Inner>,
    dispatch: Mutex<()>,
}

/// Cheap, clonable handle to one session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.shared.key)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// CONSTRUCTION & INSPECTION
// =============================================================================

impl Session {
    /// Create a detached session and arm its disconnect timer.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(key: impl Into<String>, config: SessionConfig, hooks: Hooks) -> Self {
        let shared = Arc::new(Shared {
            key: key.into(),
            config,
            hooks,
            inner: Mutex::new(Inner {
                state: State::Detached,
                opened: false,
                outbox: Vec::new(),
                inbox: Vec::new(),
                close_status: None,
                total_sent_bytes: 0,
                timers: Timers::new(),
                evictable: false,
            }),
            dispatch: Mutex::new(()),
        });
        let session = Self { shared };
        {
            let mut inner = session.lock();
            session.arm_disconnect(&mut inner);
        }
        debug!(session = %session.key(), "sockjs: session created");
        session
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.shared.key
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.lock().state.phase()
    }

    #[must_use]
    pub fn close_status(&self) -> Option<CloseStatus> {
        self.lock().close_status.clone()
    }

    /// Messages waiting for the next consumer.
    #[must_use]
    pub fn queued(&self) -> Vec<String> {
        self.lock().outbox.clone()
    }

    /// Closed, and the close grace period has elapsed.
    #[must_use]
    pub fn is_evictable(&self) -> bool {
        self.lock().evictable
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch_lock(&self) -> MutexGuard<'_, ()> {
        self.shared.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    fn from_weak(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }
}

// =============================================================================
// PUBLIC OPERATIONS
// =============================================================================

impl Session {
    /// Bind a new consumer for `transport` and return its output stream.
    ///
    /// A consumer arriving while another is bound gets
    /// `c[2010,"Another connection still open"]`; one arriving after close
    /// gets the stored close frame. Either way its stream then ends and the
    /// bound consumer is untouched.
    pub fn attach_consumer(&self, transport: Transport) -> Attachment {
        let (sink, rx) = mpsc::unbounded_channel();
        let consumer = Consumer { id: NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed), transport, sink };
        let mut attachment = Attachment { rx, session: self.clone(), consumer_id: consumer.id, rejection: None };

        let _dispatch = self.dispatch_lock();
        let first_open = {
            let mut inner = self.lock();
            let rejection = match &inner.state {
                State::Detached => None,
                State::Attached(current) => {
                    info!(
                        session = %self.key(),
                        current = current.id,
                        "sockjs: another connection still open"
                    );
                    Some(CloseStatus::another_connection())
                }
                State::Closed => Some(inner.close_status.clone().unwrap_or_default()),
            };
            if let Some(status) = rejection {
                // The rejected consumer's stream ends once `consumer` drops.
                let _ = consumer.write(&Frame::Close(status.clone()));
                attachment.rejection = Some(status);
                return attachment;
            }
            self.enter_attached(&mut inner, consumer)
        };

        if first_open {
            info!(session = %self.key(), "sockjs: session opened");
            if let Some(hook) = &self.shared.hooks.on_open {
                hook(self);
            }
        }
        attachment
    }

    /// Release the bound consumer, ending its response.
    pub fn detach_consumer(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, State::Attached(_)) {
            self.enter_detached(&mut inner);
        }
    }

    /// Queue or deliver application messages. No-op for an empty list.
    pub fn send<I, S>(&self, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let messages: Vec<String> = messages.into_iter().map(Into::into).collect();
        if messages.is_empty() {
            return;
        }
        let mut inner = self.lock();
        match inner.state.phase() {
            SessionPhase::Detached => inner.outbox.extend(messages),
            SessionPhase::Attached => self.deliver(&mut inner, Frame::Messages(messages)),
            SessionPhase::Closed => {
                debug!(
                    session = %self.key(),
                    count = messages.len(),
                    "sockjs: dropping messages for closed session"
                );
            }
        }
    }

    /// Parse an inbound payload (a JSON string or array of strings) and run
    /// the message hook once per message, in order.
    ///
    /// # Errors
    ///
    /// `InvalidJson` for a malformed payload and `NotOpen` for a closed
    /// session. Neither changes session state.
    pub fn receive_message(&self, payload: &str) -> Result<(), SockJsError> {
        let messages = parse_payload(payload)?;
        self.dispatch_inbound(messages)
    }

    /// Deliver one message that arrived without protocol framing.
    ///
    /// # Errors
    ///
    /// `NotOpen` for a closed session.
    pub fn receive_text(&self, message: impl Into<String>) -> Result<(), SockJsError> {
        self.dispatch_inbound(vec![message.into()])
    }

    /// Close with `3000 "Go away!"` unless a status was already set.
    pub fn close(&self) {
        self.close_with_status(None);
    }

    /// Close with the given status. Only the first status ever set sticks.
    pub fn close_with(&self, code: u16, reason: impl Into<String>) {
        self.close_with_status(Some(CloseStatus::new(code, reason)));
    }

    /// Send a heartbeat frame if a consumer is bound.
    pub fn heartbeat_due(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, State::Attached(_)) {
            self.deliver(&mut inner, Frame::Heartbeat);
        }
    }

    /// The physical connection of the bound consumer went away.
    pub fn peer_closed(&self) {
        let current = match &self.lock().state {
            State::Attached(consumer) => consumer.id,
            _ => return,
        };
        self.consumer_gone(current);
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

impl Session {
    /// Entry actions for `Attached`. Returns whether this was the first open.
    fn enter_attached(&self, inner: &mut Inner, consumer: Consumer) -> bool {
        debug!(
            session = %self.key(),
            consumer = consumer.id,
            transport = consumer.transport.kind().name(),
            "sockjs: consumer attached"
        );
        inner.timers.cancel(TimerName::Disconnect);
        inner.total_sent_bytes = 0;
        inner.state = State::Attached(consumer);

        let first_open = !inner.opened;
        if first_open {
            inner.opened = true;
            self.deliver(inner, Frame::Open);
        }
        if matches!(inner.state, State::Attached(_)) && !inner.outbox.is_empty() {
            let queued = std::mem::take(&mut inner.outbox);
            self.deliver(inner, Frame::Messages(queued));
        }
        if matches!(inner.state, State::Attached(_)) {
            self.arm_heartbeat(inner);
        }
        first_open
    }

    fn enter_detached(&self, inner: &mut Inner) {
        if let State::Attached(consumer) = std::mem::replace(&mut inner.state, State::Detached) {
            debug!(
                session = %self.key(),
                consumer = consumer.id,
                sent = inner.total_sent_bytes,
                "sockjs: consumer detached"
            );
        }
        inner.timers.cancel(TimerName::Heartbeat);
        self.arm_disconnect(inner);
    }

    fn enter_closed(&self, inner: &mut Inner, status: Option<CloseStatus>) {
        if inner.close_status.is_none() {
            inner.close_status = Some(status.unwrap_or_default());
        }
        if matches!(inner.state, State::Closed) {
            return;
        }
        let status = inner.close_status.clone().unwrap_or_default();
        if let State::Attached(consumer) = std::mem::replace(&mut inner.state, State::Closed) {
            // The peer may already be gone; the session closes either way.
            let _ = consumer.write(&Frame::Close(status.clone()));
        }
        inner.outbox.clear();
        inner.timers.cancel_all();
        self.arm_close(inner);
        info!(session = %self.key(), code = status.code, reason = %status.reason, "sockjs: session closed");
    }

    fn close_with_status(&self, status: Option<CloseStatus>) {
        let mut inner = self.lock();
        self.enter_closed(&mut inner, status);
    }

    /// Write a frame to the bound consumer, then apply the delivery policy:
    /// polling consumers detach after one frame, budgeted streams detach
    /// once the limit is reached, a failed write counts as a vanished peer.
    fn deliver(&self, inner: &mut Inner, frame: Frame) {
        let (result, delivery, consumer_id) = match &inner.state {
            State::Attached(consumer) => (consumer.write(&frame), consumer.transport.delivery(), consumer.id),
            _ => {
                debug_assert!(false, "deliver called without a bound consumer");
                return;
            }
        };

        match result {
            Ok(written) => {
                inner.total_sent_bytes += written;
                let recycle = match delivery {
                    Delivery::Polling => true,
                    Delivery::Streaming { budgeted } => {
                        budgeted && inner.total_sent_bytes >= self.shared.config.response_limit
                    }
                };
                if recycle {
                    self.enter_detached(inner);
                }
            }
            Err(policy) => {
                warn!(session = %self.key(), consumer = consumer_id, "sockjs: consumer write failed");
                if let Frame::Messages(mut unsent) = frame {
                    unsent.append(&mut inner.outbox);
                    inner.outbox = unsent;
                }
                match policy {
                    PeerGone::Detach => self.enter_detached(inner),
                    PeerGone::Close => self.enter_closed(inner, Some(CloseStatus::interrupted())),
                }
            }
        }
    }

    fn dispatch_inbound(&self, messages: Vec<String>) -> Result<(), SockJsError> {
        let _dispatch = self.dispatch_lock();
        let batch = {
            let mut inner = self.lock();
            match inner.state.phase() {
                SessionPhase::Closed => return Err(SockJsError::NotOpen),
                SessionPhase::Detached => {
                    // Inbound traffic counts as activity.
                    inner.timers.cancel(TimerName::Disconnect);
                    self.arm_disconnect(&mut inner);
                }
                SessionPhase::Attached => {}
            }
            if messages.is_empty() {
                return Ok(());
            }
            // Emptied before the hooks run, even if one of them panics.
            inner.inbox.extend(messages);
            std::mem::take(&mut inner.inbox)
        };

        if let Some(hook) = &self.shared.hooks.on_message {
            for message in batch {
                hook(self, message);
            }
        }
        Ok(())
    }

    fn consumer_gone(&self, consumer_id: u64) {
        let mut inner = self.lock();
        let policy = match &inner.state {
            State::Attached(consumer) if consumer.id == consumer_id => consumer.transport.on_peer_gone(),
            _ => return,
        };
        debug!(session = %self.key(), consumer = consumer_id, ?policy, "sockjs: peer went away");
        match policy {
            PeerGone::Detach => self.enter_detached(&mut inner),
            PeerGone::Close => self.enter_closed(&mut inner, Some(CloseStatus::interrupted())),
        }
    }
}

// =============================================================================
// TIMERS
// =============================================================================

impl Session {
    fn arm_disconnect(&self, inner: &mut Inner) {
        let weak = self.weak();
        inner
            .timers
            .arm_once(TimerName::Disconnect, self.shared.config.disconnect_delay, move |token| {
                if let Some(session) = Self::from_weak(&weak) {
                    session.disconnect_expired(token);
                }
            });
    }

    fn disconnect_expired(&self, token: TimerToken) {
        let mut inner = self.lock();
        if !inner.timers.complete(token) {
            return;
        }
        debug!(session = %self.key(), "sockjs: disconnect delay elapsed");
        self.enter_closed(&mut inner, None);
    }

    fn arm_heartbeat(&self, inner: &mut Inner) {
        let weak = self.weak();
        inner
            .timers
            .arm_periodic(TimerName::Heartbeat, self.shared.config.heartbeat_interval, move |token| {
                let Some(session) = Self::from_weak(&weak) else {
                    return ControlFlow::Break(());
                };
                session.heartbeat_tick(token)
            });
    }

    fn heartbeat_tick(&self, token: TimerToken) -> ControlFlow<()> {
        let mut inner = self.lock();
        if !inner.timers.is_current(token) {
            return ControlFlow::Break(());
        }
        if matches!(inner.state, State::Attached(_)) {
            self.deliver(&mut inner, Frame::Heartbeat);
        }
        ControlFlow::Continue(())
    }

    fn arm_close(&self, inner: &mut Inner) {
        let weak = self.weak();
        inner
            .timers
            .arm_once(TimerName::Close, self.shared.config.disconnect_delay, move |token| {
                if let Some(session) = Self::from_weak(&weak) {
                    session.close_expired(token);
                }
            });
    }

    fn close_expired(&self, token: TimerToken) {
        let mut inner = self.lock();
        if inner.timers.complete(token) {
            inner.evictable = true;
            debug!(session = %self.key(), "sockjs: session eligible for eviction");
        }
    }
}

// =============================================================================
// ATTACHMENT
// =============================================================================

/// Output side of one consumer: the frames written to it, already encoded.
///
/// Dropping an attachment tells the session its physical peer is gone. The
/// stream ends when the session releases the consumer.
pub struct Attachment {
    rx: mpsc::UnboundedReceiver<String>,
    session: Session,
    consumer_id: u64,
    rejection: Option<CloseStatus>,
}

impl Attachment {
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Close status written to this consumer when it was turned away at
    /// attach time, either because another consumer was bound or because the
    /// session had already closed.
    #[must_use]
    pub fn rejection(&self) -> Option<&CloseStatus> {
        self.rejection.as_ref()
    }

    /// Wait for the next encoded chunk; `None` once the consumer is released.
    pub async fn next_chunk(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take an already written chunk without waiting.
    pub fn try_next_chunk(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Released by the session and fully drained.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }
}

impl Stream for Attachment {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.session.consumer_gone(self.consumer_id);
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Decode an inbound payload into messages.
///
/// Accepts a JSON string or an array of strings. An empty payload decodes to
/// no messages.
///
/// # Errors
///
/// `InvalidJson` for anything else.
pub fn parse_payload(payload: &str) -> Result<Vec<String>, SockJsError> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(payload).map_err(|_| SockJsError::InvalidJson)?;
    match value {
        Value::String(message) => Ok(vec![message]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(message) => Ok(message),
                _ => Err(SockJsError::InvalidJson),
            })
            .collect(),
        _ => Err(SockJsError::InvalidJson),
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
