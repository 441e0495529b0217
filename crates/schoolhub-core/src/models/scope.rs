//! Scope restrictions for delegated school administrators.
//!
//! Each row names exactly one class or one section. A user with no rows
//! is unrestricted; otherwise their extent is the union of all rows.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeKind {
    Class,
    Section,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Class => "Class",
            ScopeKind::Section => "Section",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Class" => Some(ScopeKind::Class),
            "Section" => Some(ScopeKind::Section),
            _ => None,
        }
    }
}

/// The class or section a scope row (or a scoped action) refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeTarget {
    Class(Uuid),
    Section(Uuid),
}

impl ScopeTarget {
    pub fn kind(&self) -> ScopeKind {
        match self {
            ScopeTarget::Class(_) => ScopeKind::Class,
            ScopeTarget::Section(_) => ScopeKind::Section,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ScopeTarget::Class(id) | ScopeTarget::Section(id) => *id,
        }
    }

    pub fn from_parts(kind: ScopeKind, id: Uuid) -> Self {
        match kind {
            ScopeKind::Class => ScopeTarget::Class(id),
            ScopeKind::Section => ScopeTarget::Section(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminScope {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub target: ScopeTarget,
}

/// The union of a user's scope rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminScopeSet {
    pub class_ids: BTreeSet<Uuid>,
    pub section_ids: BTreeSet<Uuid>,
}

impl AdminScopeSet {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a AdminScope>) -> Self {
        rows.into_iter().map(|r| r.target).collect()
    }

    /// No rows at all: authority extends over the whole tenant.
    pub fn is_unrestricted(&self) -> bool {
        self.class_ids.is_empty() && self.section_ids.is_empty()
    }

    pub fn covers(&self, target: ScopeTarget) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        match target {
            ScopeTarget::Class(id) => self.class_ids.contains(&id),
            ScopeTarget::Section(id) => self.section_ids.contains(&id),
        }
    }
}

impl FromIterator<ScopeTarget> for AdminScopeSet {
    fn from_iter<I: IntoIterator<Item = ScopeTarget>>(iter: I) -> Self {
        let mut set = AdminScopeSet::default();
        for target in iter {
            match target {
                ScopeTarget::Class(id) => set.class_ids.insert(id),
                ScopeTarget::Section(id) => set.section_ids.insert(id),
            };
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scope_covers_everything() {
        let scope = AdminScopeSet::default();
        assert!(scope.is_unrestricted());
        assert!(scope.covers(ScopeTarget::Class(Uuid::new_v4())));
    }

    #[test]
    fn class_rows_do_not_grant_sections() {
        let class = Uuid::new_v4();
        let scope: AdminScopeSet = [ScopeTarget::Class(class)].into_iter().collect();
        assert!(scope.covers(ScopeTarget::Class(class)));
        assert!(!scope.covers(ScopeTarget::Class(Uuid::new_v4())));
        assert!(!scope.covers(ScopeTarget::Section(class)));
    }
}
