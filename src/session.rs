//! In-memory conversation sessions
//!
//! Maps a session id to its history string for the lifetime of the process.
//! Writers for one id are serialised through that id's lock; different ids
//! never contend beyond the brief map lookup.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Exclusive access to one session for the duration of a turn
pub struct SessionGuard {
    id: String,
    slot: OwnedMutexGuard<Option<String>>,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stored history, if the session has one
    pub fn history(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Replace the stored history
    pub fn commit(&mut self, history: String) {
        *self.slot = Some(history);
    }
}

/// Storage for conversation histories
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current history for a session
    async fn get(&self, id: &str) -> Option<String>;

    /// Overwrite a session's history
    #[allow(dead_code)]
    async fn put(&self, id: &str, history: String);

    /// Clear a session; returns whether it had a history
    async fn delete(&self, id: &str) -> bool;

    /// Lock a session for a read-modify-write turn
    async fn checkout(&self, id: &str) -> SessionGuard;
}

type Slot = Arc<Mutex<Option<String>>>;

/// Process-lifetime session store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Slot>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn existing(&self, id: &str) -> Option<Slot> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn slot(&self, id: &str) -> Slot {
        if let Some(slot) = self.existing(id).await {
            return slot;
        }
        self.sessions
            .write()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Option<String> {
        let slot = self.existing(id).await?;
        let history = slot.lock().await.clone();
        history
    }

    async fn put(&self, id: &str, history: String) {
        *self.slot(id).await.lock().await = Some(history);
    }

    async fn delete(&self, id: &str) -> bool {
        match self.existing(id).await {
            // Waits for an in-flight turn on this session to finish
            Some(slot) => slot.lock().await.take().is_some(),
            None => false,
        }
    }

    async fn checkout(&self, id: &str) -> SessionGuard {
        let slot = self.slot(id).await;
        SessionGuard {
            id: id.to_string(),
            slot: slot.lock_owned().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get("a").await, None);

        store.put("a", "hist".to_string()).await;
        assert_eq!(store.get("a").await.as_deref(), Some("hist"));

        assert!(store.delete("a").await);
        assert_eq!(store.get("a").await, None);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let store = InMemorySessionStore::new();
        assert!(!store.delete("never").await);
        assert!(!store.delete("never").await);
    }

    #[tokio::test]
    async fn test_checkout_commit() {
        let store = InMemorySessionStore::new();
        {
            let mut guard = store.checkout("s").await;
            assert_eq!(guard.id(), "s");
            assert_eq!(guard.history(), None);
            guard.commit("one".to_string());
        }
        let guard = store.checkout("s").await;
        assert_eq!(guard.history(), Some("one"));
    }

    #[tokio::test]
    async fn test_same_session_turns_serialise() {
        let store = Arc::new(InMemorySessionStore::new());

        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let mut guard = store.checkout("shared").await;
                let prior = guard.history().unwrap_or_default().to_string();
                tokio::time::sleep(Duration::from_millis(2)).await;
                guard.commit(format!("{prior}[{i}]"));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // No append was lost
        let history = store.get("shared").await.unwrap();
        for i in 0..8 {
            assert!(history.contains(&format!("[{i}]")), "lost turn {i}: {history}");
        }
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_block() {
        let store = InMemorySessionStore::new();
        let _held = store.checkout("busy").await;
        let other = tokio::time::timeout(Duration::from_millis(100), store.checkout("free")).await;
        assert!(other.is_ok());
    }
}
