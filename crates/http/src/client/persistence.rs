//! Session persistence
//!
//! The session logic only sees [`SessionStore::load`], [`SessionStore::save`]
//! and [`SessionStore::clear`]; whether the record lives in memory, in a file
//! or elsewhere is up to the implementation handed to the
//! [`SessionManager`](super::session::SessionManager).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pongdang_core::UserProfile;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

/// Everything that makes up a logged-in session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub profile: UserProfile,
    pub access_token: String,
    /// Mirrors the access-token cookie expiry; `None` lives until cleared
    #[serde(default)]
    pub access_token_expires_at: Option<DateTime<Utc>>,
    /// No client-side expiry, the backend enforces its lifetime
    pub refresh_token: String,
}

impl StoredSession {
    /// The access token if it has not expired at `now`
    pub fn live_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match self.access_token_expires_at {
            Some(expires_at) if expires_at <= now => None,
            _ if self.access_token.is_empty() => None,
            _ => Some(&self.access_token),
        }
    }
}

/// Session persistence errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Underlying storage failed
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record could not be decoded
    #[error("Stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// An operation needed a session and none is stored
    #[error("No session is stored")]
    Missing,
}

/// Load/save/clear contract for the session record
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredSession>, SessionError>;

    /// Replace the stored record as a whole
    async fn save(&self, session: &StoredSession) -> Result<(), SessionError>;

    /// Remove the record; clearing an empty store is not an error
    async fn clear(&self) -> Result<(), SessionError>;
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        *self.session.write().await = None;
        Ok(())
    }
}

/// JSON file store used by the CLI
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers only ever see the old file or the new one.
        let staging = self.staging_path();
        tokio::fs::write(&staging, serde_json::to_vec_pretty(session)?).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&staging, &self.path).await?;

        tracing::debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;
    use pongdang_core::{Role, Uid};

    mock! {
        pub SessionStore {}

        #[async_trait]
        impl SessionStore for SessionStore {
            async fn load(&self) -> Result<Option<StoredSession>, SessionError>;
            async fn save(&self, session: &StoredSession) -> Result<(), SessionError>;
            async fn clear(&self) -> Result<(), SessionError>;
        }
    }

    /// Admin session with tokens `A1`/`R1` and no expiry
    pub fn sample_session() -> StoredSession {
        StoredSession {
            profile: UserProfile {
                user_id: "kim".into(),
                name: "김퐁당".into(),
                nickname: Some("퐁".into()),
                role: Role::Admin,
                birthday: None,
                uid: Uid::new("7"),
            },
            access_token: "A1".into(),
            access_token_expires_at: None,
            refresh_token: "R1".into(),
        }
    }
}
