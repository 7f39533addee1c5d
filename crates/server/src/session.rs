//! Session management
//!
//! One session per media-stream connection, registered at the integration
//! boundary and removed on call end. Sessions are in-memory only; call
//! transcripts live in the transcript store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::ServerError;

/// Per-call session state
pub struct Session {
    /// Session id
    pub id: String,
    /// Creation time
    pub created_at: Instant,
    /// Last activity
    last_activity: RwLock<Instant>,
    /// Telephony call id, known once the media stream starts
    call_sid: RwLock<Option<String>>,
    /// Is active
    active: RwLock<bool>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
            call_sid: RwLock::new(None),
            active: RwLock::new(true),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Record the telephony call id
    pub fn set_call_sid(&self, call_sid: &str) {
        *self.call_sid.write() = Some(call_sid.to_string());
    }

    /// The telephony call id, falling back to the session id before `start`
    pub fn call_sid(&self) -> String {
        self.call_sid
            .read()
            .clone()
            .unwrap_or_else(|| self.id.clone())
    }

    /// Check if the session has been idle past the timeout
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    /// Close the session
    pub fn close(&self) {
        *self.active.write() = false;
    }

    /// Is the session active
    pub fn is_active(&self) -> bool {
        *self.active.read()
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    /// Create a manager with the given capacity and timing
    pub fn new(max_sessions: usize, session_timeout: Duration, cleanup_interval: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Start a background task that periodically removes expired sessions
    ///
    /// Returns a shutdown sender for stopping the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let before = manager.count();
                        manager.cleanup_expired();
                        let after = manager.count();
                        if before != after {
                            tracing::info!(
                                "session cleanup: removed {} expired sessions ({} remaining)",
                                before - after,
                                after
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Register a new session
    pub fn create(&self) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);

            if sessions.len() >= self.max_sessions {
                return Err(ServerError::Session("max sessions reached".to_string()));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(&id));
        sessions.insert(id.clone(), session.clone());

        tracing::info!("created session: {}", id);

        Ok(session)
    }

    /// Get a session by id
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session
    pub fn remove(&self, id: &str) {
        if let Some(session) = self.sessions.write().remove(id) {
            session.close();
            tracing::info!("removed session: {}", id);
        }
    }

    /// Active session count
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Remove expired sessions
    pub fn cleanup_expired(&self) {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions);
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) {
        let timeout = self.session_timeout;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some(session) = sessions.remove(&id) {
                session.close();
                tracing::info!("expired session: {}", id);
            }
        }
    }

    /// All session ids
    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(10, Duration::from_secs(3600), Duration::from_secs(300))
    }

    #[test]
    fn test_session_lifecycle() {
        let manager = manager();
        let session = manager.create().unwrap();

        assert!(session.is_active());
        assert!(!session.is_expired(Duration::from_secs(60)));
        assert_eq!(manager.count(), 1);

        let id = session.id.clone();
        assert!(manager.get(&id).is_some());

        manager.remove(&id);
        assert!(manager.get(&id).is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn test_call_sid_fallback() {
        let manager = manager();
        let session = manager.create().unwrap();

        assert_eq!(session.call_sid(), session.id);

        session.set_call_sid("CA99");
        assert_eq!(session.call_sid(), "CA99");
    }

    #[test]
    fn test_capacity_bound() {
        let manager = SessionManager::new(2, Duration::from_secs(3600), Duration::from_secs(300));
        manager.create().unwrap();
        manager.create().unwrap();

        assert!(manager.create().is_err());
    }

    #[test]
    fn test_expired_sessions_swept() {
        let manager = SessionManager::new(10, Duration::from_millis(0), Duration::from_secs(300));
        let session = manager.create().unwrap();

        std::thread::sleep(Duration::from_millis(5));
        manager.cleanup_expired();

        assert_eq!(manager.count(), 0);
        assert!(!session.is_active());
    }
}
