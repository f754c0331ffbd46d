//! Aggregate set shared by the store, local persistence and cloud sync.
//!
//! # Invariants
//! - Field order of `DashboardState` is fixed; its `serde_json` text is the
//!   canonical form used for change detection.
//! - `AggregateSet` replaces aggregates wholesale; it never merges inside one.

use crate::model::daily::DailySlot;
use crate::model::lead::Lead;
use crate::model::task::Task;
use crate::model::todo::TodoList;
use crate::model::top::TopSlot;
use serde::{Deserialize, Serialize};

/// Name of one persisted aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Aggregate {
    Xp,
    Tasks,
    Daily,
    Top,
    Todos,
    Leads,
}

impl Aggregate {
    pub const ALL: [Aggregate; 6] = [
        Self::Xp,
        Self::Tasks,
        Self::Daily,
        Self::Top,
        Self::Todos,
        Self::Leads,
    ];

    /// Stable key used both locally and as the remote field name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xp => "xp",
            Self::Tasks => "tasks",
            Self::Daily => "daily",
            Self::Top => "top",
            Self::Todos => "todos",
            Self::Leads => "leads",
        }
    }
}

/// Every persisted aggregate held by one dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardState {
    pub xp: i64,
    pub tasks: Vec<Task>,
    pub daily: DailySlot,
    pub top: TopSlot,
    pub todos: TodoList,
    pub leads: Vec<Lead>,
}

impl DashboardState {
    /// Canonical text used to compare local state against the last remote save.
    pub fn canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Subset of aggregates to overwrite, as decoded from a remote snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSet {
    pub xp: Option<i64>,
    pub tasks: Option<Vec<Task>>,
    pub daily: Option<DailySlot>,
    pub top: Option<TopSlot>,
    pub todos: Option<TodoList>,
    pub leads: Option<Vec<Lead>>,
}

impl AggregateSet {
    pub fn is_empty(&self) -> bool {
        self.xp.is_none()
            && self.tasks.is_none()
            && self.daily.is_none()
            && self.top.is_none()
            && self.todos.is_none()
            && self.leads.is_none()
    }
}
