//! In-process document store.
//!
//! Behaves like the hosted store from a client's point of view: merge
//! writes, server timestamps and change fan-out to every live subscriber
//! (the writer included). Supports failure injection for offline scenarios.

use crate::sync::document::{
    DocumentPath, DocumentSnapshot, DocumentStore, RemoteError, Subscription,
    SERVER_UPDATED_AT_FIELD,
};
use chrono::Utc;
use log::debug;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

#[derive(Default)]
struct MemoryState {
    documents: HashMap<DocumentPath, Map<String, Value>>,
    subscribers: Vec<(DocumentPath, mpsc::UnboundedSender<DocumentSnapshot>)>,
    fail_writes: bool,
    fail_subscribe: bool,
    write_count: usize,
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    state: Mutex<MemoryState>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `merge_write` fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_writes = fail;
        }
    }

    /// Makes every following `subscribe` fail until reset.
    pub fn set_fail_subscribe(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_subscribe = fail;
        }
    }

    /// Current content of one document.
    pub fn document(&self, path: &DocumentPath) -> Option<Map<String, Value>> {
        self.lock().ok()?.documents.get(path).cloned()
    }

    /// Number of accepted writes across all documents.
    pub fn write_count(&self) -> usize {
        self.lock().map(|state| state.write_count).unwrap_or(0)
    }

    /// Live subscriptions on `path`.
    pub fn subscriber_count(&self, path: &DocumentPath) -> usize {
        self.lock()
            .map(|state| {
                state
                    .subscribers
                    .iter()
                    .filter(|(target, sender)| target == path && !sender.is_closed())
                    .count()
            })
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RemoteError> {
        self.state
            .lock()
            .map_err(|_| RemoteError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn subscribe(&self, path: &DocumentPath) -> Result<Subscription, RemoteError> {
        let mut state = self.lock()?;
        if state.fail_subscribe {
            return Err(RemoteError::Unavailable("subscribe refused".to_string()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let initial = match state.documents.get(path) {
            Some(data) => DocumentSnapshot::with_data(data.clone()),
            None => DocumentSnapshot::missing(),
        };
        let _ = sender.send(initial);
        state.subscribers.push((path.clone(), sender));
        debug!("event=remote_subscribe module=memory_store status=ok path={path}");
        Ok(Subscription::new(receiver))
    }

    fn merge_write(
        &self,
        path: &DocumentPath,
        fields: Map<String, Value>,
    ) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        if state.fail_writes {
            return Err(RemoteError::Unavailable("write refused".to_string()));
        }

        let document = state.documents.entry(path.clone()).or_default();
        document.extend(fields);
        document.insert(
            SERVER_UPDATED_AT_FIELD.to_string(),
            Value::from(Utc::now().timestamp_millis()),
        );
        let snapshot = DocumentSnapshot::with_data(document.clone());
        state.write_count += 1;

        state.subscribers.retain(|(target, sender)| {
            if target != path {
                return !sender.is_closed();
            }
            sender.send(snapshot.clone()).is_ok()
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDocumentStore;
    use crate::sync::document::{DocumentPath, DocumentStore, SERVER_UPDATED_AT_FIELD};
    use serde_json::{json, Map, Value};

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn subscribe_delivers_current_state_first() {
        let store = MemoryDocumentStore::new();
        let path = DocumentPath::shared_default();
        let mut subscription = store.subscribe(&path).unwrap();
        let first = subscription.next().await.unwrap();
        assert!(!first.exists);
        assert!(!first.has_content());
    }

    #[tokio::test]
    async fn merge_write_upserts_fields_and_notifies_subscribers() {
        let store = MemoryDocumentStore::new();
        let path = DocumentPath::shared_default();
        store.merge_write(&path, fields(json!({"xp": 5, "tasks": []}))).unwrap();

        let mut subscription = store.subscribe(&path).unwrap();
        let _initial = subscription.next().await.unwrap();
        store.merge_write(&path, fields(json!({"xp": 9}))).unwrap();

        let update = subscription.next().await.unwrap();
        assert_eq!(update.data.get("xp"), Some(&json!(9)));
        assert_eq!(update.data.get("tasks"), Some(&json!([])));
        assert!(update.data.contains_key(SERVER_UPDATED_AT_FIELD));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn dropped_subscriptions_are_released() {
        let store = MemoryDocumentStore::new();
        let path = DocumentPath::shared_default();
        let subscription = store.subscribe(&path).unwrap();
        assert_eq!(store.subscriber_count(&path), 1);
        drop(subscription);
        assert_eq!(store.subscriber_count(&path), 0);
    }

    #[test]
    fn injected_failures_are_reported() {
        let store = MemoryDocumentStore::new();
        let path = DocumentPath::shared_default();
        store.set_fail_writes(true);
        assert!(store.merge_write(&path, Map::new()).is_err());
        assert_eq!(store.write_count(), 0);

        store.set_fail_subscribe(true);
        assert!(store.subscribe(&path).is_err());
    }
}
