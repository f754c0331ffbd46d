//! Lead (CRM) records and bulk import.
//!
//! # Responsibility
//! - Define the lead record and its pipeline status / priority enums.
//! - Apply drafts and patches with timestamp bookkeeping.
//! - Coerce loosely-shaped import rows into valid leads.
//!
//! # Invariants
//! - `created_at` never changes after creation.
//! - `updated_at` is refreshed on every mutation, including empty patches.
//! - Unknown status / priority text decodes to `New` / `Medium` instead of
//!   failing, for import, local load and remote snapshots alike.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Pipeline stage of a lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Won,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        Self::New,
        Self::Contacted,
        Self::Qualified,
        Self::Proposal,
        Self::Won,
        Self::Lost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Proposal => "Proposal",
            Self::Won => "Won",
            Self::Lost => "Lost",
        }
    }

    /// Case-insensitive parse; anything unrecognised maps to `New`.
    pub fn parse_lenient(value: &str) -> Self {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(normalized))
            .unwrap_or_default()
    }
}

/// Follow-up priority of a lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeadPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl LeadPriority {
    pub const ALL: [LeadPriority; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Case-insensitive parse; anything unrecognised maps to `Medium`.
    pub fn parse_lenient(value: &str) -> Self {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(normalized))
            .unwrap_or_default()
    }
}

impl Serialize for LeadStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LeadStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Self::parse_lenient).unwrap_or_default())
    }
}

impl Serialize for LeadPriority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LeadPriority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Self::parse_lenient).unwrap_or_default())
    }
}

/// CRM record. Optional contact fields are empty strings when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub business: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub priority: LeadPriority,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub updated_at: i64,
}

/// Input for creating a lead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadDraft {
    pub name: String,
    pub business: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub source: String,
    pub notes: String,
    pub status: LeadStatus,
    pub priority: LeadPriority,
}

impl LeadDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub business: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
}

impl Lead {
    /// Creates a lead from a draft, stamping both timestamps with `now_ms`.
    pub fn from_draft(draft: LeadDraft, now_ms: i64) -> Result<Self, ValidationError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyLeadName);
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            business: draft.business.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: draft.phone.trim().to_string(),
            website: draft.website.trim().to_string(),
            source: draft.source.trim().to_string(),
            notes: draft.notes,
            status: draft.status,
            priority: draft.priority,
            created_at: now_ms,
            updated_at: now_ms,
        })
    }

    /// Applies `patch` and refreshes `updated_at`.
    ///
    /// Validation happens before any field is touched, so a rejected patch
    /// leaves the lead unchanged.
    pub fn apply_patch(&mut self, patch: LeadPatch, now_ms: i64) -> Result<(), ValidationError> {
        let name = match patch.name.as_deref().map(str::trim) {
            Some("") => return Err(ValidationError::EmptyLeadName),
            Some(name) => Some(name.to_string()),
            None => None,
        };

        if let Some(name) = name {
            self.name = name;
        }
        let trimmed = |value: String| value.trim().to_string();
        if let Some(value) = patch.business {
            self.business = trimmed(value);
        }
        if let Some(value) = patch.email {
            self.email = trimmed(value);
        }
        if let Some(value) = patch.phone {
            self.phone = trimmed(value);
        }
        if let Some(value) = patch.website {
            self.website = trimmed(value);
        }
        if let Some(value) = patch.source {
            self.source = trimmed(value);
        }
        if let Some(value) = patch.notes {
            self.notes = value;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self.updated_at = now_ms;
        Ok(())
    }
}

/// Bulk import failures. Individual bad rows never produce one of these.
#[derive(Debug)]
pub enum LeadImportError {
    Malformed(serde_json::Error),
    NotAnArray,
}

impl Display for LeadImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "lead import is not valid JSON: {err}"),
            Self::NotAnArray => write!(f, "lead import must be a JSON array"),
        }
    }
}

impl Error for LeadImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::NotAnArray => None,
        }
    }
}

/// Parses a JSON array of lead-like objects.
///
/// Rows that are not objects are skipped. Object rows are always admitted:
/// missing text fields become empty strings, unknown enums fall back to
/// defaults, and ids that are missing or collide with `existing_ids` (or an
/// earlier row) are regenerated.
pub fn parse_lead_import(
    text: &str,
    existing_ids: &HashSet<String>,
    now_ms: i64,
) -> Result<Vec<Lead>, LeadImportError> {
    let value: Value = serde_json::from_str(text).map_err(LeadImportError::Malformed)?;
    let Value::Array(rows) = value else {
        return Err(LeadImportError::NotAnArray);
    };

    let mut seen: HashSet<String> = existing_ids.clone();
    let mut leads = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Object(fields) = row else {
            continue;
        };
        let field = |name: &str| fields.get(name).map(text_of).unwrap_or_default();

        let supplied_id = field("id");
        let id = if supplied_id.is_empty() || seen.contains(&supplied_id) {
            Uuid::new_v4().to_string()
        } else {
            supplied_id
        };
        seen.insert(id.clone());

        leads.push(Lead {
            id,
            name: field("name"),
            business: field("business"),
            email: field("email"),
            phone: field("phone"),
            website: field("website"),
            source: field("source"),
            notes: field("notes"),
            status: LeadStatus::parse_lenient(&field("status")),
            priority: LeadPriority::parse_lenient(&field("priority")),
            created_at: fields
                .get("createdAt")
                .and_then(Value::as_i64)
                .unwrap_or(now_ms),
            updated_at: now_ms,
        });
    }
    Ok(leads)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_lead_import, Lead, LeadDraft, LeadImportError, LeadPatch, LeadPriority, LeadStatus,
    };
    use crate::model::validation::ValidationError;
    use std::collections::HashSet;

    #[test]
    fn from_draft_requires_name_and_stamps_timestamps() {
        let err = Lead::from_draft(LeadDraft::named("   "), 10).unwrap_err();
        assert_eq!(err, ValidationError::EmptyLeadName);

        let lead = Lead::from_draft(LeadDraft::named(" Acme "), 10).unwrap();
        assert_eq!(lead.name, "Acme");
        assert_eq!(lead.created_at, 10);
        assert_eq!(lead.updated_at, 10);
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.priority, LeadPriority::Medium);
    }

    #[test]
    fn apply_patch_refreshes_updated_at_and_keeps_created_at() {
        let mut lead = Lead::from_draft(LeadDraft::named("Acme"), 10).unwrap();
        lead.apply_patch(LeadPatch::default(), 20).unwrap();
        assert_eq!(lead.updated_at, 20);

        lead.apply_patch(
            LeadPatch {
                status: Some(LeadStatus::Won),
                email: Some(" ops@acme.test ".to_string()),
                ..LeadPatch::default()
            },
            30,
        )
        .unwrap();
        assert_eq!(lead.status, LeadStatus::Won);
        assert_eq!(lead.email, "ops@acme.test");
        assert_eq!(lead.created_at, 10);
        assert_eq!(lead.updated_at, 30);
    }

    #[test]
    fn rejected_patch_leaves_lead_untouched() {
        let mut lead = Lead::from_draft(LeadDraft::named("Acme"), 10).unwrap();
        let before = lead.clone();
        let err = lead
            .apply_patch(
                LeadPatch {
                    name: Some(" ".to_string()),
                    status: Some(LeadStatus::Lost),
                    ..LeadPatch::default()
                },
                99,
            )
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyLeadName);
        assert_eq!(lead, before);
    }

    #[test]
    fn import_coerces_unknown_enums_and_keeps_every_object_row() {
        let text = r#"[
            {"id": "l1", "name": "Acme", "status": "Qualified", "priority": "high"},
            {"name": "Globex", "status": "Sleeping", "priority": 3}
        ]"#;
        let leads = parse_lead_import(text, &HashSet::new(), 500).unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].id, "l1");
        assert_eq!(leads[0].status, LeadStatus::Qualified);
        assert_eq!(leads[0].priority, LeadPriority::High);
        assert_eq!(leads[1].status, LeadStatus::New);
        assert_eq!(leads[1].priority, LeadPriority::Medium);
        assert!(!leads[1].id.is_empty());
    }

    #[test]
    fn import_admits_rows_with_missing_fields_and_regenerates_colliding_ids() {
        let existing: HashSet<String> = ["taken".to_string()].into_iter().collect();
        let text = r#"[{"id": "taken", "createdAt": 42}, 7, {"id": "fresh"}, {"id": "fresh"}]"#;
        let leads = parse_lead_import(text, &existing, 500).unwrap();
        assert_eq!(leads.len(), 3);
        assert_ne!(leads[0].id, "taken");
        assert_eq!(leads[0].name, "");
        assert_eq!(leads[0].created_at, 42);
        assert_eq!(leads[0].updated_at, 500);
        assert_eq!(leads[1].id, "fresh");
        assert_ne!(leads[2].id, "fresh");
    }

    #[test]
    fn import_rejects_non_array_input() {
        assert!(matches!(
            parse_lead_import("{}", &HashSet::new(), 0),
            Err(LeadImportError::NotAnArray)
        ));
        assert!(matches!(
            parse_lead_import("not json", &HashSet::new(), 0),
            Err(LeadImportError::Malformed(_))
        ));
    }

    #[test]
    fn stored_leads_with_unknown_status_still_decode() {
        let lead: Lead =
            serde_json::from_str(r#"{"id":"x","name":"Acme","status":"Ghosted","priority":null}"#)
                .unwrap();
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.priority, LeadPriority::Medium);
    }
}
