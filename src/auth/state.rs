//! Pure session state machine.
//!
//! The token lifecycle is modeled as an enum-tagged state plus a single
//! transition function returning the new state and the side effects to
//! execute. All I/O (timers, storage, callbacks) lives in the
//! [`TokenManager`](crate::auth::TokenManager) shell, which keeps the
//! transitions independently testable.

use std::time::Duration;

use crate::auth::tokens::{StoredTokenRecord, TokenPair};

/// Session lifecycle state.
///
/// "Expired" is a derived view of `Valid` (tokens present, now past
/// `expires_at`): reads treat it as `Empty`, refresh scheduling distinguishes
/// it. `Destroyed` is terminal; every event is a no-op once entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Valid(StoredTokenRecord),
    Destroyed,
}

impl SessionState {
    /// Tokens readable at `now`? Expired records read as empty.
    pub fn readable_tokens(&self, now_millis: i64) -> Option<&TokenPair> {
        match self {
            SessionState::Valid(record) if !record.is_expired(now_millis) => Some(&record.tokens),
            _ => None,
        }
    }
}

/// Input events driving the session lifecycle.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Storage hydration completed with the loaded record, if any
    Hydrated(Option<StoredTokenRecord>),
    /// A fresh pair arrived from login, register, or a completed refresh
    TokensIssued(TokenPair),
    /// The proactive refresh timer fired
    RefreshDue,
    /// The refresh callback rejected
    RefreshFailed,
    /// Explicit logout or 401-triggered reset
    Cleared,
    /// Owner teardown
    Destroy,
}

/// Side effects the shell executes after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Arm the (single) refresh timer to fire after the delay
    ScheduleRefresh(Duration),
    /// Invoke the refresh callback immediately, without arming a timer
    RefreshNow,
    /// Abort any pending refresh timer
    CancelRefresh,
    /// Write the record to the credential store (best effort)
    Persist(StoredTokenRecord),
    /// Remove the record from the credential store (best effort)
    Purge,
    /// Invoke the session-expired callback
    NotifySessionExpired,
}

/// Apply one event to the session state.
pub fn transition(
    state: SessionState,
    event: SessionEvent,
    now_millis: i64,
) -> (SessionState, Vec<Effect>) {
    // Terminal: nothing fires, nothing schedules, nothing persists
    if state == SessionState::Destroyed {
        return (SessionState::Destroyed, Vec::new());
    }

    match event {
        SessionEvent::Hydrated(loaded) => {
            // Hydration only fills an empty session; a login that raced
            // ahead of it wins
            if !matches!(state, SessionState::Empty) {
                return (state, Vec::new());
            }
            match loaded {
                Some(record) if record.is_expired(now_millis) => {
                    (SessionState::Empty, vec![Effect::Purge])
                }
                Some(record) => {
                    let effects = vec![schedule_for(&record, now_millis)];
                    (SessionState::Valid(record), effects)
                }
                None => (SessionState::Empty, Vec::new()),
            }
        }

        SessionEvent::TokensIssued(pair) => {
            let record = StoredTokenRecord::issue(pair, now_millis);
            let effects = vec![
                Effect::Persist(record.clone()),
                schedule_for(&record, now_millis),
            ];
            (SessionState::Valid(record), effects)
        }

        SessionEvent::RefreshDue => match state {
            SessionState::Valid(_) => {
                let effects = vec![Effect::RefreshNow];
                (state, effects)
            }
            _ => (state, Vec::new()),
        },

        // No automatic retry and no implicit clear: a transient refresh
        // failure does not destroy a session that may still be valid for a
        // few more seconds. Retry-or-logout policy belongs to the caller.
        SessionEvent::RefreshFailed => (state, vec![Effect::NotifySessionExpired]),

        SessionEvent::Cleared => (
            SessionState::Empty,
            vec![Effect::CancelRefresh, Effect::Purge],
        ),

        SessionEvent::Destroy => (SessionState::Destroyed, vec![Effect::CancelRefresh]),
    }
}

fn schedule_for(record: &StoredTokenRecord, now_millis: i64) -> Effect {
    match record.refresh_delay(now_millis) {
        Some(delay) => Effect::ScheduleRefresh(delay),
        None => Effect::RefreshNow,
    }
}
