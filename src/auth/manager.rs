//! Token manager: the I/O shell around the session state machine.
//!
//! Owns the in-memory session state, schedules the proactive refresh, and
//! persists the token record through a [`CredentialStore`]. All mutation
//! flows through [`state::transition`](crate::auth::state::transition); this
//! module only executes the effects it returns.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::auth::error::AuthError;
use crate::auth::state::{transition, Effect, SessionEvent, SessionState};
use crate::auth::tokens::{
    now_millis, StoredTokenRecord, TokenPair, REFRESH_BUFFER, SESSION_STORAGE_KEY,
};
use crate::store::CredentialStore;

/// Async provider of a fresh token pair, invoked by the proactive refresh.
pub type RefreshCallback =
    Arc<dyn Fn() -> BoxFuture<'static, Result<TokenPair, AuthError>> + Send + Sync>;

/// Invoked when a proactive refresh fails; retry-or-logout policy belongs to
/// the registrant, not the manager.
pub type SessionExpiredCallback = Arc<dyn Fn() + Send + Sync>;

/// Shared handle to one session's token state.
/// Clone is cheap - the state lives behind an Arc; one manager instance is
/// expected per process.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Mutex<Inner>>,
    store: Arc<dyn CredentialStore>,
}

struct Inner {
    state: SessionState,
    /// In-memory expiry deadline on the tokio clock; checked eagerly on
    /// every read so a token is never served past its nominal lifetime
    deadline: Option<Instant>,
    /// Bumped on every login/clear/destroy; timer callbacks and refresh
    /// results are applied only if the generation they captured is unchanged,
    /// so a late-arriving refresh cannot resurrect a cleared session
    generation: u64,
    refresh_task: Option<JoinHandle<()>>,
    on_refresh: Option<RefreshCallback>,
    on_session_expired: Option<SessionExpiredCallback>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Empty,
                deadline: None,
                generation: 0,
                refresh_task: None,
                on_refresh: None,
                on_session_expired: None,
            })),
            store,
        }
    }

    /// Load the persisted record, if any. Run once after construction;
    /// callers do not have to await it, but reads before it completes may
    /// return `None` even though a valid record exists on disk.
    pub async fn hydrate(&self) {
        let expected = self.inner.lock().unwrap().generation;

        let record = match self.store.get(SESSION_STORAGE_KEY).await {
            Some(raw) => match serde_json::from_str::<StoredTokenRecord>(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Persisted session record is corrupt, purging");
                    self.store.remove(SESSION_STORAGE_KEY).await;
                    None
                }
            },
            None => None,
        };

        if !self
            .apply(SessionEvent::Hydrated(record), Some(expected), false)
            .await
        {
            debug!("Hydration superseded by a login that completed first");
        }
    }

    /// Store a freshly issued pair: computes the new expiry, persists the
    /// record (best effort), and re-arms the single refresh timer.
    pub async fn set_tokens(&self, tokens: TokenPair) {
        self.apply(SessionEvent::TokensIssued(tokens), None, true)
            .await;
    }

    /// The access token, or `None` when destroyed, absent, or past expiry.
    /// The clock check is eager - a token past its lifetime is never
    /// returned, even if the scheduled refresh has not fired yet.
    pub fn get_access_token(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        match (&inner.state, inner.deadline) {
            (SessionState::Valid(record), Some(deadline)) if Instant::now() < deadline => {
                Some(record.tokens.access_token.clone())
            }
            _ => None,
        }
    }

    /// The refresh token, if a session is present. Refresh tokens have their
    /// own server-side lifetime, so they stay readable past access-token
    /// expiry - an explicit refresh can still succeed.
    pub fn get_refresh_token(&self) -> Option<String> {
        match &self.inner.lock().unwrap().state {
            SessionState::Valid(record) => Some(record.tokens.refresh_token.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_access_token().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, SessionState::Destroyed)
    }

    /// Register the refresh provider. Re-registering re-arms the single
    /// timer, so a session restored by hydration before the callback existed
    /// still gets its proactive refresh.
    pub fn set_refresh_callback(&self, callback: RefreshCallback) {
        let rearm = {
            let mut inner = self.inner.lock().unwrap();
            if matches!(inner.state, SessionState::Destroyed) {
                return;
            }
            inner.on_refresh = Some(callback);
            match (&inner.state, inner.deadline) {
                (SessionState::Valid(_), Some(deadline)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    Some((remaining, inner.generation))
                }
                _ => None,
            }
        };
        if let Some((remaining, generation)) = rearm {
            if remaining <= REFRESH_BUFFER {
                self.arm_invoke(generation);
            } else {
                self.arm_timer(remaining - REFRESH_BUFFER, generation);
            }
        }
    }

    pub fn set_session_expired_callback(&self, callback: SessionExpiredCallback) {
        let mut inner = self.inner.lock().unwrap();
        if matches!(inner.state, SessionState::Destroyed) {
            return;
        }
        inner.on_session_expired = Some(callback);
    }

    /// Cancel the timer, wipe memory and storage. Idempotent, never fails.
    pub async fn clear(&self) {
        self.apply(SessionEvent::Cleared, None, true).await;
    }

    /// One-way teardown: cancels the timer, drops callbacks, and makes every
    /// accessor return `None` permanently. No further timers are ever
    /// scheduled, regardless of later calls or in-flight callbacks.
    pub async fn destroy(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.on_refresh = None;
            inner.on_session_expired = None;
        }
        self.apply(SessionEvent::Destroy, None, true).await;
    }

    /// Run one event through the state machine and execute its effects.
    /// Returns false when `expected_generation` no longer matches, i.e. the
    /// event came from a superseded timer or refresh and was discarded.
    async fn apply(
        &self,
        event: SessionEvent,
        expected_generation: Option<u64>,
        bump: bool,
    ) -> bool {
        let sets_deadline = matches!(
            event,
            SessionEvent::TokensIssued(_) | SessionEvent::Hydrated(Some(_))
        );

        let (effects, generation) = {
            let mut guard = self.inner.lock().unwrap();
            let inner = &mut *guard;
            if let Some(expected) = expected_generation {
                if inner.generation != expected {
                    return false;
                }
            }
            if bump {
                inner.generation = inner.generation.wrapping_add(1);
            }
            let now = now_millis();
            let (next, effects) = transition(inner.state.clone(), event, now);
            inner.state = next;
            match &inner.state {
                SessionState::Valid(record) if sets_deadline => {
                    inner.deadline = Some(Instant::now() + record.remaining(now));
                }
                SessionState::Valid(_) => {}
                _ => inner.deadline = None,
            }
            (effects, inner.generation)
        };

        for effect in effects {
            match effect {
                Effect::Persist(record) => match serde_json::to_string(&record) {
                    Ok(json) => self.store.set(SESSION_STORAGE_KEY, &json).await,
                    Err(e) => warn!(error = %e, "Failed to serialize session record"),
                },
                Effect::Purge => self.store.remove(SESSION_STORAGE_KEY).await,
                Effect::CancelRefresh => {
                    let old = self.inner.lock().unwrap().refresh_task.take();
                    if let Some(old) = old {
                        old.abort();
                    }
                }
                Effect::ScheduleRefresh(delay) => self.arm_timer(delay, generation),
                Effect::RefreshNow => self.arm_invoke(generation),
                Effect::NotifySessionExpired => {
                    let callback = self.inner.lock().unwrap().on_session_expired.clone();
                    if let Some(callback) = callback {
                        callback();
                    }
                }
            }
        }
        true
    }

    /// Arm the refresh timer; fires as a `RefreshDue` event after `delay`.
    fn arm_timer(&self, delay: Duration, generation: u64) {
        let manager = self.clone();
        debug!(delay_secs = delay.as_secs(), "Scheduling proactive token refresh");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager
                .apply(SessionEvent::RefreshDue, Some(generation), false)
                .await;
        });
        self.replace_task(task);
    }

    /// Invoke the refresh callback without a timer (record already inside
    /// the buffer window, or the `RefreshDue` event just fired).
    fn arm_invoke(&self, generation: u64) {
        let manager = self.clone();
        let task = tokio::spawn(async move {
            manager.invoke_refresh(generation).await;
        });
        self.replace_task(task);
    }

    /// Swap in the new refresh task; at most one is live per manager.
    /// When called from within the firing task itself, the abort targets the
    /// current task - harmless, because schedule effects are always last and
    /// nothing awaits after this point.
    fn replace_task(&self, task: JoinHandle<()>) {
        let old = self.inner.lock().unwrap().refresh_task.replace(task);
        if let Some(old) = old {
            old.abort();
        }
    }

    async fn invoke_refresh(&self, generation: u64) {
        let callback = {
            let inner = self.inner.lock().unwrap();
            if inner.generation != generation
                || !matches!(inner.state, SessionState::Valid(_))
            {
                return;
            }
            inner.on_refresh.clone()
        };
        let Some(callback) = callback else {
            debug!("No refresh callback registered, session will lapse at expiry");
            return;
        };

        debug!("Proactive token refresh firing");
        match callback().await {
            Ok(tokens) => {
                if !self
                    .apply(SessionEvent::TokensIssued(tokens), Some(generation), true)
                    .await
                {
                    debug!("Discarding refresh result for a superseded session");
                }
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "Proactive token refresh failed");
                // No generation precondition here: a 401 inside the callback
                // already cleared the session (bumping the generation), and
                // the expiry notification must still reach the UI. Destroyed
                // managers drop the event in the state machine.
                self.apply(SessionEvent::RefreshFailed, None, false).await;
            }
        }
    }
}
