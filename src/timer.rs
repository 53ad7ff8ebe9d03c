//! Named, cancelable session timers.
//!
//! DESIGN
//! ======
//! Each session owns one `Timers` table with at most one live timer per
//! `TimerName`. A timer is a spawned tokio task; the table keeps its abort
//! handle plus a generation number. The callback receives a `TimerToken`
//! and must check it against the table (under the session lock) before acting,
//! so a timer that was cancelled after it woke up but before it got the lock
//! cannot fire into a newer state.
//!
//! Arming a name that is already armed is a no-op, as is cancelling a name
//! that is not armed. Dropping the table aborts everything it still holds.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerName {
    /// Closes a session that has gone too long without a consumer.
    Disconnect,
    /// Sends heartbeat frames to the attached consumer.
    Heartbeat,
    /// Marks a closed session as eligible for eviction.
    Close,
}

/// Identity of one armed timer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub name: TimerName,
    generation: u64,
}

struct Armed {
    generation: u64,
    handle: AbortHandle,
}

#[derive(Default)]
pub struct Timers {
    armed: HashMap<TimerName, Armed>,
    generation: u64,
}

impl Timers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_armed(&self, name: TimerName) -> bool {
        self.armed.contains_key(&name)
    }

    /// Whether `token` still names the live instance of its timer.
    #[must_use]
    pub fn is_current(&self, token: TimerToken) -> bool {
        self.armed
            .get(&token.name)
            .is_some_and(|armed| armed.generation == token.generation)
    }

    /// Arm a one-shot timer. Returns `false` if `name` was already armed.
    ///
    /// The callback should call [`Timers::complete`] with its token before
    /// doing any work.
    pub fn arm_once<F>(&mut self, name: TimerName, delay: Duration, fire: F) -> bool
    where
        F: FnOnce(TimerToken) + Send + 'static,
    {
        if self.is_armed(name) {
            return false;
        }
        let token = self.next_token(name);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(token);
        })
        .abort_handle();
        self.armed.insert(name, Armed { generation: token.generation, handle });
        true
    }

    /// Arm a periodic timer whose first tick lands one `period` from now.
    /// Returns `false` if `name` was already armed.
    ///
    /// The task stops when `tick` returns `ControlFlow::Break`.
    pub fn arm_periodic<F>(&mut self, name: TimerName, period: Duration, mut tick: F) -> bool
    where
        F: FnMut(TimerToken) -> ControlFlow<()> + Send + 'static,
    {
        if self.is_armed(name) {
            return false;
        }
        let token = self.next_token(name);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick(token).is_break() {
                    break;
                }
            }
        })
        .abort_handle();
        self.armed.insert(name, Armed { generation: token.generation, handle });
        true
    }

    /// Retire a one-shot timer from inside its own callback.
    ///
    /// Returns `false` when the token is stale, in which case the callback
    /// must do nothing.
    pub fn complete(&mut self, token: TimerToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.armed.remove(&token.name);
        true
    }

    pub fn cancel(&mut self, name: TimerName) {
        if let Some(armed) = self.armed.remove(&name) {
            armed.handle.abort();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, armed) in self.armed.drain() {
            armed.handle.abort();
        }
    }

    fn next_token(&mut self, name: TimerName) -> TimerToken {
        self.generation += 1;
        TimerToken { name, generation: self.generation }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "timer_test.rs"]
mod tests;
