//! Session bookkeeping shared between the controller handle and the
//! playback thread.
//!
//! At most one session is active. Starting or stopping a session takes the
//! gate lock, and tones are started while holding it, so a session that has
//! been replaced or stopped can never start another tone.

use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Identifier of one playback session. Ids increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        SessionId(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    /// A session was invalidated and the playback thread has not wound it
    /// down yet.
    Stopping,
}

/// Snapshot of the playback state for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub session: Option<SessionId>,
}

#[derive(Debug, Default)]
struct GateState {
    last_id: u64,
    active: Option<SessionId>,
    stopping: Option<SessionId>,
}

#[derive(Debug, Default)]
pub struct SessionGate {
    inner: Mutex<GateState>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // Nothing panics while holding the lock except caller tone code;
        // the state itself stays consistent, so recover from poisoning.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new session, invalidating the current one.
    /// Returns the new id and the session it replaced, if any.
    pub fn begin(&self) -> (SessionId, Option<SessionId>) {
        let mut g = self.lock();
        g.last_id += 1;
        let id = SessionId(g.last_id);
        let replaced = g.active.replace(id);
        if replaced.is_some() {
            g.stopping = replaced;
        }
        (id, replaced)
    }

    /// Invalidate the active session. No-op when idle.
    pub fn invalidate(&self) -> Option<SessionId> {
        let mut g = self.lock();
        let stopped = g.active.take();
        if stopped.is_some() {
            g.stopping = stopped;
        }
        stopped
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.lock().active == Some(id)
    }

    /// Run `f` only if `id` is still the active session, holding the gate
    /// for the duration of the call.
    pub fn run_if_active<R>(&self, id: SessionId, f: impl FnOnce() -> R) -> Option<R> {
        let g = self.lock();
        if g.active != Some(id) {
            return None;
        }
        let result = f();
        drop(g);
        Some(result)
    }

    /// Finish `id` naturally. Returns false if it was invalidated first, in
    /// which case the completion must not be reported.
    pub fn complete(&self, id: SessionId) -> bool {
        let mut g = self.lock();
        if g.active == Some(id) {
            g.active = None;
            true
        } else {
            false
        }
    }

    /// Drop `id` without completion (e.g. the device failed to start).
    pub fn abandon(&self, id: SessionId) {
        let mut g = self.lock();
        if g.active == Some(id) {
            g.active = None;
        }
    }

    /// The playback thread has wound `id` down after invalidation.
    pub fn settle(&self, id: SessionId) {
        let mut g = self.lock();
        if g.stopping == Some(id) {
            g.stopping = None;
        }
    }

    pub fn active(&self) -> Option<SessionId> {
        self.lock().active
    }

    pub fn state(&self) -> PlaybackState {
        self.status().state
    }

    pub fn status(&self) -> PlaybackStatus {
        let g = self.lock();
        let state = if g.active.is_some() {
            PlaybackState::Playing
        } else if g.stopping.is_some() {
            PlaybackState::Stopping
        } else {
            PlaybackState::Idle
        };
        PlaybackStatus {
            state,
            session: g.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let gate = SessionGate::new();
        assert_eq!(gate.state(), PlaybackState::Idle);
        assert_eq!(gate.active(), None);
    }

    #[test]
    fn ids_increase() {
        let gate = SessionGate::new();
        let (a, _) = gate.begin();
        let (b, replaced) = gate.begin();
        assert!(b > a);
        assert_eq!(replaced, Some(a));
    }

    #[test]
    fn begin_invalidates_previous_session() {
        let gate = SessionGate::new();
        let (a, _) = gate.begin();
        let (b, _) = gate.begin();
        assert!(!gate.is_active(a));
        assert!(gate.is_active(b));
        assert_eq!(gate.run_if_active(a, || ()), None);
        assert_eq!(gate.run_if_active(b, || 7), Some(7));
    }

    #[test]
    fn invalidate_moves_to_stopping_then_idle() {
        let gate = SessionGate::new();
        let (a, _) = gate.begin();
        assert_eq!(gate.state(), PlaybackState::Playing);
        assert_eq!(gate.invalidate(), Some(a));
        assert_eq!(gate.state(), PlaybackState::Stopping);
        gate.settle(a);
        assert_eq!(gate.state(), PlaybackState::Idle);
    }

    #[test]
    fn invalidate_when_idle_is_noop() {
        let gate = SessionGate::new();
        assert_eq!(gate.invalidate(), None);
        assert_eq!(gate.state(), PlaybackState::Idle);
    }

    #[test]
    fn complete_before_stop_wins() {
        let gate = SessionGate::new();
        let (a, _) = gate.begin();
        assert!(gate.complete(a));
        assert_eq!(gate.invalidate(), None);
        assert_eq!(gate.state(), PlaybackState::Idle);
    }

    #[test]
    fn stop_before_complete_suppresses_completion() {
        let gate = SessionGate::new();
        let (a, _) = gate.begin();
        gate.invalidate();
        assert!(!gate.complete(a));
    }

    #[test]
    fn stale_settle_does_not_clear_newer_stop() {
        let gate = SessionGate::new();
        let (a, _) = gate.begin();
        let (b, _) = gate.begin();
        gate.invalidate();
        gate.settle(a);
        assert_eq!(gate.state(), PlaybackState::Stopping);
        gate.settle(b);
        assert_eq!(gate.state(), PlaybackState::Idle);
    }

    #[test]
    fn abandon_returns_to_idle() {
        let gate = SessionGate::new();
        let (a, _) = gate.begin();
        gate.abandon(a);
        assert_eq!(gate.state(), PlaybackState::Idle);
        assert!(!gate.complete(a));
    }

    #[test]
    fn status_serializes_lowercase_state() {
        let gate = SessionGate::new();
        gate.begin();
        let json = serde_json::to_string(&gate.status()).unwrap();
        assert_eq!(json, r#"{"state":"playing","session":1}"#);
    }
}
