//! Delegated administrator management types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scope::{AdminScopeSet, ScopeKind, ScopeTarget};
use super::user::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDelegatedAdminRequest {
    pub tenant_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub class_ids: Vec<Uuid>,
    #[serde(default)]
    pub section_ids: Vec<Uuid>,
}

/// Patch for a delegated administrator. Each present list fully
/// replaces what was stored; class and section lists are independent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateDelegatedAdminRequest {
    pub name: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub class_ids: Option<Vec<Uuid>>,
    pub section_ids: Option<Vec<Uuid>>,
}

/// Storage-level input for creating a delegated administrator.
#[derive(Debug, Clone)]
pub struct NewDelegatedAdmin {
    pub tenant_id: Uuid,
    pub name: String,
    pub role_id: Uuid,
    pub email: String,
    pub secret: String,
    pub permission_ids: Vec<Uuid>,
    pub scopes: Vec<ScopeTarget>,
}

/// Storage-level replacement set for a delegated administrator.
#[derive(Debug, Clone, Default)]
pub struct DelegatedAdminChanges {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<Uuid>>,
    pub class_ids: Option<Vec<Uuid>>,
    pub section_ids: Option<Vec<Uuid>>,
}

impl DelegatedAdminChanges {
    /// The replacement list for one scope kind, if that kind is being
    /// replaced.
    pub fn scope_replacement(&self, kind: ScopeKind) -> Option<&[Uuid]> {
        match kind {
            ScopeKind::Class => self.class_ids.as_deref(),
            ScopeKind::Section => self.section_ids.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSummary {
    pub user: User,
    pub email: Option<String>,
    pub permissions: BTreeSet<String>,
    pub scope: AdminScopeSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_lists_default_to_empty() {
        let request: CreateDelegatedAdminRequest = serde_json::from_value(serde_json::json!({
            "tenant_id": Uuid::nil(),
            "name": "Wing Head",
            "email": "wing@gv.test",
        }))
        .unwrap();
        assert!(request.password.is_none());
        assert!(request.permissions.is_empty());
        assert!(request.class_ids.is_empty());
        assert!(request.section_ids.is_empty());
    }

    #[test]
    fn patch_distinguishes_absent_from_empty() {
        let patch: UpdateDelegatedAdminRequest =
            serde_json::from_value(serde_json::json!({ "class_ids": [] })).unwrap();
        assert_eq!(patch.class_ids, Some(Vec::new()));
        assert!(patch.section_ids.is_none());
        assert!(patch.permissions.is_none());
    }
}
