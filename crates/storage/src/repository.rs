use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutorial_core::model::{AuthToken, Session, User};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key of the bearer-token entry.
pub const TOKEN_KEY: &str = "tutorial-token";
/// Key of the user-profile entry (JSON).
pub const USER_KEY: &str = "tutorial-user";

/// The two raw entries a session is persisted as.
///
/// Kept separate from `Session` so adapters can store them independently and
/// a half-written pair can be recognized on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub token: Option<String>,
    pub user_json: Option<String>,
}

impl StoredSession {
    /// Encode a session into its two entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the user cannot be encoded.
    pub fn encode(session: &Session) -> Result<Self, StorageError> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(Self {
            token: Some(session.token.as_str().to_owned()),
            user_json: Some(user_json),
        })
    }

    /// Decode the pair. Both entries must be present, the token non-blank and
    /// the user entry valid JSON; anything else reads as "no session".
    #[must_use]
    pub fn decode(&self) -> Option<Session> {
        let token = AuthToken::new(self.token.as_deref()?);
        if token.is_blank() {
            return None;
        }
        let user: User = serde_json::from_str(self.user_json.as_deref()?).ok()?;
        Some(Session::new(user, token))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user_json.is_none()
    }
}

/// Durable client-local session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the raw entries as they are on disk.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn read_entries(&self) -> Result<StoredSession, StorageError>;

    /// Persist both entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entries cannot be written.
    async fn save(&self, session: &Session) -> Result<(), StorageError>;

    /// Remove both entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entries cannot be removed.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Load the persisted session. An incomplete or unreadable pair is
    /// cleared and reported as `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or cleared.
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        let entries = self.read_entries().await?;
        if entries.is_empty() {
            return Ok(None);
        }
        match entries.decode() {
            Some(session) => Ok(Some(session)),
            None => {
                self.clear().await?;
                Ok(None)
            }
        }
    }
}

/// Simple in-memory store for tests and throwaway runs.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a single raw entry, bypassing session encoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn read_entries(&self) -> Result<StoredSession, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(StoredSession {
            token: guard.get(TOKEN_KEY).cloned(),
            user_json: guard.get(USER_KEY).cloned(),
        })
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        let stored = StoredSession::encode(session)?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let (Some(token), Some(user)) = (stored.token, stored.user_json) {
            guard.insert(TOKEN_KEY.to_owned(), token);
            guard.insert(USER_KEY.to_owned(), user);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(TOKEN_KEY);
        guard.remove(USER_KEY);
        Ok(())
    }
}

/// Aggregates the client-local stores behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub session: Arc<dyn SessionStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let session: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        Self { session }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorial_core::model::{Role, UserId, UserProfile};

    fn session() -> Session {
        let user = User {
            id: UserId::new("u1"),
            name: "Siti".into(),
            username: "siti".into(),
            email: "siti@example.com".into(),
            role: Role::Admin,
            profile: UserProfile {
                karang_taruna_name: "KT Melati".into(),
                ..UserProfile::default()
            },
            created_at: None,
        };
        Session::new(user, AuthToken::new("tok-1"))
    }

    #[tokio::test]
    async fn save_then_load_returns_session() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.load().await.unwrap(), None);

        store.save(&session()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, session());
        assert!(loaded.is_admin());
    }

    #[tokio::test]
    async fn clear_removes_both_entries() {
        let store = InMemorySessionStore::new();
        store.save(&session()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.read_entries().await.unwrap().is_empty());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn user_without_token_loads_as_none_and_is_cleared() {
        let store = InMemorySessionStore::new();
        let stored = StoredSession::encode(&session()).unwrap();
        store
            .put_raw(USER_KEY, stored.user_json.as_deref().unwrap())
            .unwrap();

        assert_eq!(store.load().await.unwrap(), None);
        assert!(store.read_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_user_entry_loads_as_none() {
        let store = InMemorySessionStore::new();
        store.put_raw(TOKEN_KEY, "tok").unwrap();
        store.put_raw(USER_KEY, "{not json").unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        assert!(store.read_entries().await.unwrap().is_empty());
    }

    #[test]
    fn blank_token_does_not_decode() {
        let mut stored = StoredSession::encode(&session()).unwrap();
        stored.token = Some("  ".into());
        assert_eq!(stored.decode(), None);
    }
}
