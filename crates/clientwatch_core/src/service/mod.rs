//! Use-case services over the domain model.
//!
//! # Responsibility
//! - Orchestrate validation, mutation and local persistence per user action.
//! - Keep callers (sync driver, CLI, UI bindings) storage-agnostic.

pub mod dashboard_store;
