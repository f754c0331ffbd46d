//! Local persistence: key-value contracts, backends and the aggregate adapter.
//!
//! # Responsibility
//! - Define the synchronous key-value contract the dashboard persists through.
//! - Provide SQLite and in-memory backends.
//! - Serialize aggregates as JSON text under namespaced keys.
//!
//! # Invariants
//! - Backends surface transport failures as `RepoError`; only the aggregate
//!   adapter decides to swallow them.

pub mod kv_repo;
pub mod persistence;
