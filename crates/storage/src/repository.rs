use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use quiz_core::Clock;
use quiz_core::model::{QuizSession, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Session-scoped key/value store.
///
/// Each session is written as a whole document; the last write wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session by id, `None` if it was never saved or was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend is unreachable or the stored
    /// document no longer decodes.
    async fn load(&self, id: &SessionId) -> Result<Option<QuizSession>, StorageError>;

    /// Persist or replace a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn save(&self, id: &SessionId, session: &QuizSession) -> Result<(), StorageError>;

    /// Drop a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such session exists.
    async fn remove(&self, id: &SessionId) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
struct StoredSession {
    document: String,
    touched: DateTime<Utc>,
}

/// In-memory store keeping each session as serialized JSON.
///
/// With an idle TTL set, sessions not saved or loaded within the TTL are
/// evicted on the next `save` or `load`.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, StoredSession>>>,
    clock: Clock,
    idle_ttl: Option<TimeDelta>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            clock: Clock::default(),
            idle_ttl: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Evict sessions idle for longer than `ttl`.
    #[must_use]
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = TimeDelta::from_std(ttl).ok();
        self
    }

    /// Drop every session idle for longer than the TTL as of `now`.
    ///
    /// Returns the number of evicted sessions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(self.sweep(&mut guard, now))
    }

    fn sweep(&self, sessions: &mut HashMap<SessionId, StoredSession>, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let before = sessions.len();
        sessions.retain(|_, stored| now - stored.touched <= ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "idle sessions evicted");
        }
        evicted
    }

    /// Number of stored sessions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<QuizSession>, StorageError> {
        let now = self.clock.now();
        let raw = {
            let mut guard = self
                .sessions
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            self.sweep(&mut guard, now);
            guard.get_mut(id).map(|stored| {
                stored.touched = now;
                stored.document.clone()
            })
        };
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, id: &SessionId, session: &QuizSession) -> Result<(), StorageError> {
        let document = serde_json::to_string(session)?;
        let now = self.clock.now();
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        self.sweep(&mut guard, now);
        guard.insert(
            id.clone(),
            StoredSession {
                document,
                touched: now,
            },
        );
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.remove(id) {
            Some(_) => {
                debug!(session = %id, "session removed");
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }
}

/// Store handles behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(InMemorySessionStore::new()),
        }
    }

    /// In-memory sessions evicted after `idle_ttl` without a save or load.
    #[must_use]
    pub fn in_memory_with_ttl(clock: Clock, idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(
                InMemorySessionStore::new()
                    .with_clock(clock)
                    .with_idle_ttl(idle_ttl),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::TaskId;
    use quiz_core::time::fixed_now;

    #[tokio::test]
    async fn round_trips_session_state() {
        let store = InMemorySessionStore::new();
        let id = SessionId::generate();
        let mut session = QuizSession::new();
        session.ensure_metrics();
        session.begin_generation(TaskId::for_session(&id));

        store.save(&id, &session).await.unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(loaded.generation_in_progress());
    }

    #[tokio::test]
    async fn unknown_session_loads_none() {
        let store = InMemorySessionStore::new();
        assert!(store.load(&SessionId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_on_save() {
        let start = fixed_now();
        let store = InMemorySessionStore::new()
            .with_clock(Clock::fixed(start))
            .with_idle_ttl(Duration::from_secs(60));
        let idle = SessionId::generate();
        let active = SessionId::generate();
        store.save(&idle, &QuizSession::new()).await.unwrap();

        // Same map, read later: `active` stays fresh.
        let later = store
            .clone()
            .with_clock(Clock::fixed(start + TimeDelta::seconds(45)));
        later.save(&active, &QuizSession::new()).await.unwrap();
        assert_eq!(store.len().unwrap(), 2);

        let after_ttl = store
            .clone()
            .with_clock(Clock::fixed(start + TimeDelta::seconds(61)));
        after_ttl.save(&SessionId::generate(), &QuizSession::new()).await.unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert!(after_ttl.load(&idle).await.unwrap().is_none());
        assert!(after_ttl.load(&active).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn loading_keeps_a_session_alive() {
        let start = fixed_now();
        let store = InMemorySessionStore::new()
            .with_clock(Clock::fixed(start))
            .with_idle_ttl(Duration::from_secs(60));
        let id = SessionId::generate();
        store.save(&id, &QuizSession::new()).await.unwrap();

        let at = |secs| {
            store
                .clone()
                .with_clock(Clock::fixed(start + TimeDelta::seconds(secs)))
        };
        assert!(at(50).load(&id).await.unwrap().is_some());
        assert!(at(100).load(&id).await.unwrap().is_some());
        assert_eq!(store.evict_idle(start + TimeDelta::seconds(200)).unwrap(), 1);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn without_ttl_nothing_is_evicted() {
        let store = InMemorySessionStore::new().with_clock(Clock::fixed(fixed_now()));
        store.save(&SessionId::generate(), &QuizSession::new()).await.unwrap();
        assert_eq!(store.evict_idle(fixed_now() + TimeDelta::days(365)).unwrap(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_missing_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store.remove(&SessionId::generate()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
