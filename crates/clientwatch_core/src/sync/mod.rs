//! Cloud sync against one shared remote document.
//!
//! # Responsibility
//! - Define the document-store contract the dashboard syncs through.
//! - Apply remote snapshots into the store without echoing them back.
//! - Debounce local changes into field-level merge writes.
//!
//! # Invariants
//! - Exactly one subscription per running driver.
//! - Conflict policy is last-write-wins on the whole aggregate.
//! - Sync failures never block local mutations.

pub mod document;
pub mod driver;
pub mod engine;
pub mod memory;
pub mod sanitize;
