//! Effective authority: the capability set a user holds plus the extent
//! over which it applies.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::scope::{AdminScopeSet, ScopeTarget};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectiveAuthority {
    /// Union of role-level and direct grants, collapsed by name.
    pub permissions: BTreeSet<String>,
    pub scope: AdminScopeSet,
}

impl EffectiveAuthority {
    pub fn new<R, D>(role_permissions: R, direct_permissions: D, scope: AdminScopeSet) -> Self
    where
        R: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
    {
        Self {
            permissions: role_permissions.into_iter().chain(direct_permissions).collect(),
            scope,
        }
    }

    /// Exact, case-sensitive match; no wildcards or hierarchy.
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }

    /// Capability check for a class/section-scoped action.
    pub fn permits(&self, name: &str, target: ScopeTarget) -> bool {
        self.has_permission(name) && self.scope.covers(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn union_collapses_duplicates() {
        let authority = EffectiveAuthority::new(
            ["VIEW_STUDENTS".to_string(), "EDIT_GRADES".to_string()],
            ["EDIT_GRADES".to_string()],
            AdminScopeSet::default(),
        );
        assert_eq!(authority.permissions.len(), 2);
    }

    #[test]
    fn names_are_case_sensitive() {
        let authority =
            EffectiveAuthority::new(["VIEW_STUDENTS".to_string()], [], AdminScopeSet::default());
        assert!(authority.has_permission("VIEW_STUDENTS"));
        assert!(!authority.has_permission("view_students"));
    }

    #[test]
    fn scoped_action_needs_capability_and_extent() {
        let section = Uuid::new_v4();
        let scope: AdminScopeSet = [ScopeTarget::Section(section)].into_iter().collect();
        let authority = EffectiveAuthority::new(["MARK_ATTENDANCE".to_string()], [], scope);
        assert!(authority.permits("MARK_ATTENDANCE", ScopeTarget::Section(section)));
        assert!(!authority.permits("MARK_ATTENDANCE", ScopeTarget::Section(Uuid::new_v4())));
        assert!(!authority.permits("EDIT_GRADES", ScopeTarget::Section(section)));
    }
}
