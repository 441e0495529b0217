//! Tenant (school) domain model.
//!
//! A tenant is the isolation root: academic years, users, identities and
//! entitlements all carry the owning tenant's id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of institution a tenant represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TenantKind {
    #[default]
    School,
    College,
    Coaching,
}

impl TenantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantKind::School => "School",
            TenantKind::College => "College",
            TenantKind::Coaching => "Coaching",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "School" => Some(TenantKind::School),
            "College" => Some(TenantKind::College),
            "Coaching" => Some(TenantKind::Coaching),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Globally unique short code (e.g. `DPS01`).
    pub code: String,
    /// Globally unique subdomain the tenant is served under.
    pub subdomain: String,
    pub name: String,
    pub kind: TenantKind,
    /// Soft-deactivation flag; inactive tenants keep their data.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields that can be updated on an existing tenant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub kind: Option<TenantKind>,
    pub is_active: Option<bool>,
}
