//! Reusable XP-granting tasks.

use crate::model::validation::{normalize_label, require_positive_xp, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One action the user can complete for XP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub label: String,
    pub xp: i64,
    #[serde(default)]
    pub group: Option<String>,
}

impl Task {
    /// Creates a validated task with a generated id.
    ///
    /// Blank groups are stored as `None`.
    pub fn new(label: &str, xp: i64, group: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            label: normalize_label(label)?,
            xp: require_positive_xp(xp)?,
            group: group
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        })
    }

    fn seed(id: &str, label: &str, xp: i64, group: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            xp,
            group: Some(group.to_string()),
        }
    }
}

/// Task set installed on first run.
pub fn seed_tasks() -> Vec<Task> {
    vec![
        Task::seed("seed-cold-call", "Cold call a prospect", 50, "Sales"),
        Task::seed("seed-follow-up", "Send a follow-up email", 25, "Sales"),
        Task::seed("seed-discovery", "Book a discovery meeting", 100, "Sales"),
        Task::seed("seed-proposal", "Send a proposal", 150, "Sales"),
        Task::seed("seed-close", "Close a deal", 500, "Sales"),
        Task::seed("seed-social", "Publish a social post", 30, "Marketing"),
        Task::seed("seed-article", "Write a blog article", 150, "Marketing"),
        Task::seed("seed-referral", "Ask a client for a referral", 40, "Marketing"),
    ]
}
