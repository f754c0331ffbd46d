//! Core domain logic for the ClientWatch sales dashboard.
//! This crate is the single source of truth for dashboard invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, DashboardConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::lead::{Lead, LeadDraft, LeadPatch, LeadPriority, LeadStatus};
pub use model::ordering::MoveDirection;
pub use model::rank::{xp_to_rank, Rank, RankConfig};
pub use model::state::{Aggregate, DashboardState};
pub use repo::kv_repo::{KvStore, MemoryKvStore, RepoError, RepoResult, SqliteKvStore};
pub use service::dashboard_store::{DashboardStore, StoreError, StoreResult};
pub use sync::document::{DocumentPath, DocumentSnapshot, DocumentStore, RemoteError};
pub use sync::driver::{DashboardHandle, DriverClosed, SyncDriver};
pub use sync::engine::{SyncEngine, SyncStatus};
pub use sync::memory::MemoryDocumentStore;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
