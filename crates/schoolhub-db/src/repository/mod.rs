//! SurrealDB repository implementations.

mod academic_year;
mod delegated_admin;
mod entitlement;
mod identity;
mod module;
mod permission;
mod provisioning;
mod role;
mod scope;
mod tenant;
mod user;

pub use academic_year::SurrealAcademicYearRepository;
pub use delegated_admin::SurrealDelegatedAdminRepository;
pub use entitlement::SurrealEntitlementRepository;
pub use identity::SurrealAuthIdentityRepository;
pub use module::SurrealModuleRepository;
pub use permission::SurrealPermissionRepository;
pub use provisioning::SurrealProvisioningRepository;
pub use role::SurrealRoleRepository;
pub use scope::SurrealAdminScopeRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::decode(what, e))
}
