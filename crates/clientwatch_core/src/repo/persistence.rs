//! Aggregate persistence adapter over a `KvStore`.
//!
//! # Responsibility
//! - Encode aggregates as JSON text under `"<namespace>:<aggregate>"` keys.
//! - Degrade silently: storage or decode failures never reach the caller.
//!
//! # Invariants
//! - `load` returns the caller's default on a missing key, a backend error or
//!   malformed text.
//! - `save` failures are logged and otherwise ignored; in-memory state stays
//!   authoritative.

use crate::model::state::Aggregate;
use crate::repo::kv_repo::KvStore;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Namespaced JSON persistence for dashboard aggregates.
pub struct LocalPersistence<S: KvStore> {
    namespace: String,
    store: S,
}

impl<S: KvStore> LocalPersistence<S> {
    pub fn new(namespace: impl Into<String>, store: S) -> Self {
        Self {
            namespace: namespace.into(),
            store,
        }
    }

    /// Storage key for one aggregate.
    pub fn key_for(&self, aggregate: Aggregate) -> String {
        format!("{}:{}", self.namespace, aggregate.as_str())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Serializes and writes `value`. Returns whether the write landed.
    pub fn save<T: Serialize + ?Sized>(&self, aggregate: Aggregate, value: &T) -> bool {
        let key = self.key_for(aggregate);
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "event=local_save module=persistence status=error key={} error_code=serialize_failed error={}",
                    key, err
                );
                return false;
            }
        };

        match self.store.set(&key, &text) {
            Ok(()) => {
                debug!(
                    "event=local_save module=persistence status=ok key={} bytes={}",
                    key,
                    text.len()
                );
                true
            }
            Err(err) => {
                warn!(
                    "event=local_save module=persistence status=error key={} error_code=write_failed error={}",
                    key, err
                );
                false
            }
        }
    }

    /// Reads and decodes one aggregate, falling back to `default`.
    pub fn load<T: DeserializeOwned>(&self, aggregate: Aggregate, default: T) -> T {
        let key = self.key_for(aggregate);
        let text = match self.store.get(&key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("event=local_load module=persistence status=skip key={key} reason=missing");
                return default;
            }
            Err(err) => {
                warn!(
                    "event=local_load module=persistence status=error key={} error_code=read_failed error={}",
                    key, err
                );
                return default;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=local_load module=persistence status=error key={} error_code=malformed error={}",
                    key, err
                );
                default
            }
        }
    }
}
