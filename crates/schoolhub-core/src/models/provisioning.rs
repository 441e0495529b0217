//! Request and result types for tenant provisioning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tenant::TenantKind;

/// Caller-facing request to create a tenant with its first
/// administrator, academic year and module set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTenantRequest {
    pub name: String,
    pub code: String,
    pub subdomain: String,
    #[serde(default)]
    pub kind: Option<TenantKind>,
    pub academic_year_name: String,
    /// When set, the year ends one year minus one day later; otherwise
    /// the year runs from now for one year.
    #[serde(default)]
    pub academic_year_start: Option<DateTime<Utc>>,
    pub admin_name: String,
    pub admin_email: String,
    /// A configured fallback is used when omitted.
    #[serde(default)]
    pub admin_password: Option<String>,
    /// `None` enables the configured default set; `Some(vec![])` enables
    /// nothing.
    #[serde(default)]
    pub module_keys: Option<Vec<String>>,
}

/// Fully resolved provisioning input handed to storage. Everything in
/// here is written inside a single transaction.
#[derive(Debug, Clone)]
pub struct ProvisionTenant {
    pub name: String,
    pub code: String,
    pub subdomain: String,
    pub kind: TenantKind,
    pub year_name: String,
    pub year_start: DateTime<Utc>,
    pub year_end: DateTime<Utc>,
    /// Well-known role the first user receives.
    pub admin_role_name: String,
    pub admin_name: String,
    /// Normalized email.
    pub admin_email: String,
    /// Hashed credential.
    pub admin_secret: String,
    /// Catalog modules to enable.
    pub module_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionedAdmin {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionedYear {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantSummary {
    pub tenant_id: Uuid,
    pub code: String,
    pub admin: ProvisionedAdmin,
    pub academic_year: ProvisionedYear,
    /// Keys of the modules that were actually enabled.
    pub enabled_modules: Vec<String>,
}
