use serde::{Deserialize, Serialize};
use std::sync::Arc;

use elimu_core::model::{Identity, Role, UserId};

use crate::repository::{KeyValueStore, StorageError};

/// Fixed key the signed-in identity lives under.
pub const SESSION_KEY: &str = "elimu/session";

/// Persisted shape for the signed-in identity.
///
/// This mirrors the domain `Identity` so the store can serialize and
/// deserialize without leaking storage concerns into the domain layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDoc {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub grade: Option<u8>,
}

impl SessionDoc {
    #[must_use]
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            id: identity.id().as_str().to_owned(),
            name: identity.name().to_owned(),
            email: identity.email().to_owned(),
            role: identity.role(),
            grade: identity.grade(),
        }
    }

    /// Convert the document back into a domain `Identity`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored fields no longer
    /// pass identity validation.
    pub fn into_identity(self) -> Result<Identity, StorageError> {
        Identity::new(UserId::new(self.id), self.name, self.email, self.role, self.grade)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }
}

/// Reads and writes the single persisted session under [`SESSION_KEY`].
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Fetch the stored identity, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` when a value is present but
    /// cannot be decoded; callers decide whether to drop it or give up.
    pub async fn load(&self) -> Result<Option<Identity>, StorageError> {
        let Some(raw) = self.kv.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        let doc: SessionDoc = serde_json::from_str(&raw)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        doc.into_identity().map(Some)
    }

    /// Persist the identity, replacing any previous session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, identity: &Identity) -> Result<(), StorageError> {
        let doc = SessionDoc::from_identity(identity);
        let raw = serde_json::to_string(&doc)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.put(SESSION_KEY, &raw).await
    }

    /// Drop the stored session. A no-op when none is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove(SESSION_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKv;

    fn identity() -> Identity {
        Identity::new(
            UserId::new("u-1"),
            "Asha",
            "asha@example.com",
            Role::Learner,
            Some(7),
        )
        .unwrap()
    }

    fn store() -> (SessionStore, Arc<dyn KeyValueStore>) {
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKv::new());
        (SessionStore::new(Arc::clone(&kv)), kv)
    }

    #[tokio::test]
    async fn load_without_a_session_is_none() {
        let (store, _) = store();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_returns_the_identity() {
        let (store, _) = store();
        store.save(&identity()).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, identity());
    }

    #[tokio::test]
    async fn clear_removes_the_session() {
        let (store, _) = store();
        store.save(&identity()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_in_the_slot_is_a_serialization_error() {
        let (store, kv) = store();
        kv.put(SESSION_KEY, "{not json").await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn stored_doc_that_fails_validation_is_an_error() {
        let (store, kv) = store();
        let raw = r#"{"id":"u-1","name":"","email":"a@example.com","role":"learner","grade":7}"#;
        kv.put(SESSION_KEY, raw).await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
