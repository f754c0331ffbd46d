//! Domain model for the gamified sales dashboard.
//!
//! # Responsibility
//! - Define the persisted aggregates (xp, tasks, daily, top, todos, leads).
//! - Provide the pure rank computation derived from XP.
//!
//! # Invariants
//! - XP is the only stored progress value; rank is always derived.
//! - Every record carries a string id that stays stable across devices.

pub mod daily;
pub mod lead;
pub mod ordering;
pub mod rank;
pub mod state;
pub mod task;
pub mod todo;
pub mod top;
pub mod validation;
