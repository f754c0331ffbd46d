//! Input validation shared by domain constructors.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected user input for a domain record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Label is empty after trimming.
    EmptyLabel,
    /// XP grant must be at least 1.
    NonPositiveXp(i64),
    /// Lead name is empty after trimming.
    EmptyLeadName,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel => write!(f, "label must not be empty"),
            Self::NonPositiveXp(value) => write!(f, "xp must be >= 1, got {value}"),
            Self::EmptyLeadName => write!(f, "lead name must not be empty"),
        }
    }
}

impl Error for ValidationError {}

/// Trims a label and rejects blank input.
pub fn normalize_label(label: &str) -> Result<String, ValidationError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    Ok(trimmed.to_string())
}

/// Rejects XP grants below 1.
pub fn require_positive_xp(xp: i64) -> Result<i64, ValidationError> {
    if xp < 1 {
        return Err(ValidationError::NonPositiveXp(xp));
    }
    Ok(xp)
}
