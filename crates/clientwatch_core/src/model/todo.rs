//! Plain todo list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub done: bool,
}

/// Order-preserving todo sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TodoList {
    #[serde(default)]
    pub items: Vec<Todo>,
}

impl TodoList {
    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Drops completed items and returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.done);
        before - self.items.len()
    }
}
