//! Prioritised "top tasks" slot.

use serde::{Deserialize, Serialize};

/// Maximum number of top items unless configured otherwise.
pub const DEFAULT_TOP_CAPACITY: usize = 5;

/// One prioritised item, either copied from a `Task` or free-standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopItem {
    pub id: String,
    pub label: String,
    pub xp: i64,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub source_task_id: Option<String>,
}

/// Date-stamped list of today's top items.
///
/// Unlike the daily slot, a stale date is reported but never auto-cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopSlot {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub items: Vec<TopItem>,
}

impl TopSlot {
    pub fn new(date: &str) -> Self {
        Self {
            date: date.to_string(),
            items: Vec::new(),
        }
    }

    pub fn is_stale(&self, today: &str) -> bool {
        self.date != today
    }

    /// Whether an item copied from `task_id` with the same `label` exists.
    pub fn contains_task_copy(&self, task_id: &str, label: &str) -> bool {
        self.items.iter().any(|item| {
            item.source_task_id.as_deref() == Some(task_id) && item.label == label
        })
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}
