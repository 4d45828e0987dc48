//! Session manager: the single source of truth for "who is logged in"
//!
//! The manager owns the [`SessionStore`], the logout-in-progress gate and the
//! logout subscribers. It is constructed explicitly and shared by handle
//! (`Arc<SessionManager>`) between the HTTP client and whatever drives the UI.

use super::persistence::{SessionError, SessionStore, StoredSession};
use chrono::Utc;
use pongdang_core::UserProfile;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::{debug, info, warn};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to log out
    UserInitiated,
    /// The access token could not be reissued
    SessionExpired,
}

/// Handle returned by [`SessionManager::on_logout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type LogoutListener = Arc<dyn Fn(LogoutReason) + Send + Sync>;

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    logging_out: AtomicBool,
    logout_grace: Duration,
    listeners: Mutex<Vec<(ListenerId, LogoutListener)>>,
    next_listener: AtomicU64,
    reissue_lock: AsyncMutex<()>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, logout_grace: Duration) -> Self {
        Self {
            store,
            logging_out: AtomicBool::new(false),
            logout_grace,
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            reissue_lock: AsyncMutex::new(()),
        }
    }

    /// Persist a fresh session, replacing any previous one in a single write
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written
    pub async fn set_session(
        &self,
        profile: UserProfile,
        access_token: String,
        refresh_token: String,
        access_ttl: Option<chrono::Duration>,
    ) -> Result<(), SessionError> {
        let session = StoredSession {
            profile,
            access_token,
            access_token_expires_at: access_ttl.map(|ttl| Utc::now() + ttl),
            refresh_token,
        };
        self.store.save(&session).await?;
        info!(user_id = %session.profile.user_id, "Session established");
        Ok(())
    }

    /// Current access token, read from the store on every call.
    ///
    /// `None` means unauthenticated: no session, an expired token, or a
    /// record that cannot be read.
    pub async fn access_token(&self) -> Option<String> {
        match self.store.load().await {
            Ok(Some(session)) => session.live_access_token(Utc::now()).map(str::to_owned),
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable session while attaching token: {e}");
                None
            }
        }
    }

    /// The stored record, including an expired access token
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read
    pub async fn current_session(&self) -> Result<Option<StoredSession>, SessionError> {
        self.store.load().await
    }

    /// Profile of the logged-in user
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read
    pub async fn profile(&self) -> Result<Option<UserProfile>, SessionError> {
        Ok(self.store.load().await?.map(|session| session.profile))
    }

    pub async fn is_authenticated(&self) -> bool {
        self.access_token().await.is_some()
    }

    /// Store a reissued access token; the refresh token is only replaced when
    /// the backend rotated it
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Missing`] if the session was cleared meanwhile,
    /// or a storage error
    pub async fn update_access_token(
        &self,
        access_token: String,
        access_ttl: Option<chrono::Duration>,
        rotated_refresh_token: Option<String>,
    ) -> Result<(), SessionError> {
        let mut session = self.store.load().await?.ok_or(SessionError::Missing)?;
        session.access_token = access_token;
        session.access_token_expires_at = access_ttl.map(|ttl| Utc::now() + ttl);
        if let Some(refresh_token) = rotated_refresh_token {
            session.refresh_token = refresh_token;
        }
        self.store.save(&session).await
    }

    /// Tear the session down.
    ///
    /// Closes the logout gate, gives `notify` the outgoing session for a
    /// best-effort server notification, wipes the store and tells every
    /// subscriber. The wipe and the event happen even if `notify` fails.
    /// Returns `Ok(false)` without doing anything if a logout is already
    /// running, so subscribers hear about each logout once.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be cleared. Subscribers are
    /// still notified in that case.
    pub async fn clear_session<F, Fut, E>(
        &self,
        reason: LogoutReason,
        notify: F,
    ) -> Result<bool, SessionError>
    where
        F: FnOnce(StoredSession) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        if self.logging_out.swap(true, Ordering::SeqCst) {
            debug!("Logout already in progress");
            return Ok(false);
        }

        match self.store.load().await {
            Ok(Some(session)) => {
                if let Err(e) = notify(session).await {
                    warn!("Server logout notification failed: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping server logout notification: {e}"),
        }

        let cleared = self.store.clear().await;
        info!(?reason, "Session cleared");
        self.emit(reason);
        cleared.map(|()| true)
    }

    pub fn is_logging_out(&self) -> bool {
        self.logging_out.load(Ordering::SeqCst)
    }

    /// Reopen the logout gate after the grace period.
    ///
    /// Call once the post-logout screen is up; requests issued before this
    /// returns are still refused.
    pub async fn settle_logout(&self) {
        if !self.is_logging_out() {
            return;
        }
        tokio::time::sleep(self.logout_grace).await;
        self.logging_out.store(false, Ordering::SeqCst);
        debug!("Logout settled");
    }

    /// Subscribe to logout events
    pub fn on_logout(&self, listener: impl Fn(LogoutReason) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Serialises reissue round trips
    pub(crate) async fn reissue_guard(&self) -> AsyncMutexGuard<'_, ()> {
        self.reissue_lock.lock().await
    }

    fn emit(&self, reason: LogoutReason) {
        // Snapshot so a listener may (un)subscribe without deadlocking.
        let listeners: Vec<LogoutListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(reason);
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("logging_out", &self.is_logging_out())
            .field("logout_grace", &self.logout_grace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::persistence::MemorySessionStore;
    use crate::client::persistence::mock::{MockSessionStore, sample_session};
    use std::sync::atomic::AtomicUsize;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemorySessionStore::new()), Duration::from_millis(10))
    }

    async fn logged_in() -> SessionManager {
        let manager = manager();
        let session = sample_session();
        manager
            .set_session(session.profile, session.access_token, session.refresh_token, None)
            .await
            .unwrap();
        manager
    }

    fn counter(manager: &SessionManager) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        manager.on_logout(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[tokio::test]
    async fn set_session_makes_token_readable() {
        let manager = logged_in().await;
        assert_eq!(manager.access_token().await.as_deref(), Some("A1"));
        assert_eq!(manager.profile().await.unwrap().unwrap().uid.as_str(), "7");
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn ttl_sets_expiry() {
        let manager = manager();
        let session = sample_session();
        manager
            .set_session(
                session.profile,
                "A1".into(),
                "R1".into(),
                Some(chrono::Duration::days(-1)),
            )
            .await
            .unwrap();

        assert_eq!(manager.access_token().await, None);
        assert!(manager.current_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_keeps_refresh_token_unless_rotated() {
        let manager = logged_in().await;

        manager.update_access_token("A2".into(), None, None).await.unwrap();
        let session = manager.current_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "A2");
        assert_eq!(session.refresh_token, "R1");

        manager
            .update_access_token("A3".into(), None, Some("R2".into()))
            .await
            .unwrap();
        let session = manager.current_session().await.unwrap().unwrap();
        assert_eq!(session.refresh_token, "R2");
    }

    #[tokio::test]
    async fn update_without_session_is_missing() {
        let manager = manager();
        let result = manager.update_access_token("A2".into(), None, None).await;
        assert!(matches!(result, Err(SessionError::Missing)));
    }

    #[tokio::test]
    async fn clear_wipes_even_when_notification_fails() {
        let manager = logged_in().await;
        let count = counter(&manager);

        let cleared = manager
            .clear_session(LogoutReason::UserInitiated, |session| async move {
                assert_eq!(session.refresh_token, "R1");
                Err::<(), _>("backend down")
            })
            .await
            .unwrap();

        assert!(cleared);
        assert!(manager.current_session().await.unwrap().is_none());
        assert_eq!(manager.access_token().await, None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(manager.is_logging_out());
    }

    #[tokio::test]
    async fn second_clear_while_logging_out_is_a_no_op() {
        let manager = logged_in().await;
        let count = counter(&manager);

        let notify = |_| async { Ok::<(), String>(()) };
        assert!(manager.clear_session(LogoutReason::SessionExpired, notify).await.unwrap());
        assert!(!manager.clear_session(LogoutReason::SessionExpired, notify).await.unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn settle_reopens_the_gate() {
        let manager = logged_in().await;
        manager
            .clear_session(LogoutReason::UserInitiated, |_| async { Ok::<(), String>(()) })
            .await
            .unwrap();
        assert!(manager.is_logging_out());

        manager.settle_logout().await;
        assert!(!manager.is_logging_out());
    }

    #[tokio::test]
    async fn listeners_receive_reason_and_can_be_removed() {
        let manager = logged_in().await;
        let reasons = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reasons);
        let id = manager.on_logout(move |reason| sink.lock().unwrap().push(reason));
        let removed = counter(&manager);
        let other = manager.on_logout(|_| panic!("removed listener was called"));
        assert!(manager.remove_listener(other));
        assert!(!manager.remove_listener(other));

        manager
            .clear_session(LogoutReason::SessionExpired, |_| async { Ok::<(), String>(()) })
            .await
            .unwrap();

        assert_eq!(*reasons.lock().unwrap(), vec![LogoutReason::SessionExpired]);
        assert_eq!(removed.load(Ordering::SeqCst), 1);
        assert!(manager.remove_listener(id));
    }

    #[tokio::test]
    async fn unreadable_record_is_an_error_not_an_identity() {
        let mut store = MockSessionStore::new();
        store
            .expect_load()
            .returning(|| Err(SessionError::Corrupt(serde_json::from_str::<()>("{").unwrap_err())));
        let manager = SessionManager::new(Arc::new(store), Duration::ZERO);

        assert_eq!(manager.access_token().await, None);
        assert!(!manager.is_authenticated().await);
        assert!(matches!(manager.profile().await, Err(SessionError::Corrupt(_))));
        assert!(matches!(
            manager.current_session().await,
            Err(SessionError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn failed_wipe_still_notifies() {
        let mut store = MockSessionStore::new();
        store.expect_load().returning(|| Ok(None));
        store
            .expect_clear()
            .times(1)
            .returning(|| Err(SessionError::Io(std::io::Error::other("read-only"))));
        let manager = SessionManager::new(Arc::new(store), Duration::ZERO);
        let count = counter(&manager);

        let result = manager
            .clear_session(LogoutReason::UserInitiated, |_| async { Ok::<(), String>(()) })
            .await;

        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
