//! Feature module catalog and per-tenant entitlement models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SchoolError, SchoolResult};

/// A global catalog entry, e.g. `ATTENDANCE` or `EXAMS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: Uuid,
    /// Immutable identifier: uppercase letters and underscores.
    pub key: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateModule {
    pub key: String,
    /// Display name; derived from the key when omitted.
    pub name: Option<String>,
}

/// The (tenant, module) entitlement row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolModule {
    pub tenant_id: Uuid,
    pub module_id: Uuid,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One requested change in a bulk entitlement update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitlementChange {
    pub module_id: Uuid,
    pub enabled: bool,
}

/// Three-state view of an entitlement. Consumers that only need a
/// boolean use [`EntitlementState::is_enabled`], which treats a missing
/// row as disabled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntitlementState {
    NotProvisioned,
    Disabled,
    Enabled,
}

impl EntitlementState {
    pub fn from_row(row: Option<&SchoolModule>) -> Self {
        match row {
            None => EntitlementState::NotProvisioned,
            Some(r) if r.enabled => EntitlementState::Enabled,
            Some(_) => EntitlementState::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, EntitlementState::Enabled)
    }
}

/// Check a module key: non-empty, `A-Z` and `_` only.
pub fn validate_module_key(key: &str) -> SchoolResult<()> {
    if key.is_empty() {
        return Err(SchoolError::validation("module key must not be empty"));
    }
    if !key.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
        return Err(SchoolError::validation(format!(
            "module key '{key}' may only contain uppercase letters and underscores"
        )));
    }
    Ok(())
}

/// `LEAVE_MANAGEMENT` -> `Leave Management`.
pub fn display_name_for_key(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
