//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation; a record
//! owned by another tenant is reported as not found.

use uuid::Uuid;

use crate::error::SchoolResult;
use crate::models::{
    academic_year::{AcademicYear, AcademicYearName, CreateAcademicYear, UpdateAcademicYear},
    admin::{DelegatedAdminChanges, NewDelegatedAdmin},
    identity::{AuthIdentity, CreateAuthIdentity, IdentityKind},
    module::{CreateModule, Module, SchoolModule},
    permission::{CreatePermission, Permission},
    provisioning::{ProvisionTenant, TenantSummary},
    role::{CreateRole, Role},
    scope::{AdminScope, ScopeKind},
    tenant::{Tenant, UpdateTenant},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenants & provisioning
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SchoolResult<Tenant>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = SchoolResult<Tenant>> + Send;
    fn get_by_subdomain(
        &self,
        subdomain: &str,
    ) -> impl Future<Output = SchoolResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = SchoolResult<Tenant>> + Send;
    /// Hard delete. Cascades to every record the tenant owns.
    fn delete(&self, id: Uuid) -> impl Future<Output = SchoolResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = SchoolResult<PaginatedResult<Tenant>>> + Send;
}

pub trait ProvisioningRepository: Send + Sync {
    /// Create tenant, active academic year, first administrator, its
    /// email identity and the requested entitlements in one transaction.
    ///
    /// The returned summary's `enabled_modules` is left empty; module
    /// keys are known to the caller.
    fn provision_tenant(
        &self,
        input: ProvisionTenant,
    ) -> impl Future<Output = SchoolResult<TenantSummary>> + Send;
}

// ---------------------------------------------------------------------------
// Academic years (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait AcademicYearRepository: Send + Sync {
    /// Insert a year. When the status is `Active`, the existing-active
    /// check runs in the same transaction as the insert.
    fn create(
        &self,
        input: CreateAcademicYear,
    ) -> impl Future<Output = SchoolResult<AcademicYear>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SchoolResult<AcademicYear>> + Send;
    /// Apply a patch. When the patch sets `Active`, other active years
    /// of the tenant (excluding this one) are checked in the same
    /// transaction.
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateAcademicYear,
    ) -> impl Future<Output = SchoolResult<AcademicYear>> + Send;
    /// All years of a tenant, ordered by start date.
    fn list_by_tenant(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Vec<AcademicYear>>> + Send;
    fn get_active(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Option<AcademicYear>>> + Send;
    /// Distinct year names across all tenants, most recently created
    /// first. Not tenant-scoped.
    fn list_distinct_names(
        &self,
    ) -> impl Future<Output = SchoolResult<Vec<AcademicYearName>>> + Send;
}

// ---------------------------------------------------------------------------
// Module catalog & entitlements
// ---------------------------------------------------------------------------

pub trait ModuleRepository: Send + Sync {
    fn create(&self, input: CreateModule) -> impl Future<Output = SchoolResult<Module>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SchoolResult<Module>> + Send;
    fn get_by_key(&self, key: &str) -> impl Future<Output = SchoolResult<Module>> + Send;
    /// Modules whose key is in `keys`; unknown keys are skipped.
    fn get_by_keys(
        &self,
        keys: &[String],
    ) -> impl Future<Output = SchoolResult<Vec<Module>>> + Send;
    /// The whole catalog ordered by key.
    fn list(&self) -> impl Future<Output = SchoolResult<Vec<Module>>> + Send;
}

pub trait EntitlementRepository: Send + Sync {
    /// Insert or update the (tenant, module) row.
    fn upsert(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
        enabled: bool,
    ) -> impl Future<Output = SchoolResult<SchoolModule>> + Send;
    /// Set `enabled = false` on an existing row. Missing row is
    /// `EntitlementNotFound`.
    fn disable(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
    ) -> impl Future<Output = SchoolResult<SchoolModule>> + Send;
    fn get(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Option<SchoolModule>>> + Send;
    fn list_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Vec<SchoolModule>>> + Send;
}

// ---------------------------------------------------------------------------
// Users & identities (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = SchoolResult<User>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SchoolResult<User>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = SchoolResult<User>> + Send;
    /// Hard delete; identities, scope rows and direct grants go with it.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = SchoolResult<()>> + Send;
    fn list_by_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Vec<User>>> + Send;
    /// Record a profile view.
    fn touch_last_seen(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SchoolResult<()>> + Send;
}

pub trait AuthIdentityRepository: Send + Sync {
    /// Unique on `(tenant_id, kind, value)`; a clash on an email identity
    /// is `DuplicateEmail`.
    fn create(
        &self,
        input: CreateAuthIdentity,
    ) -> impl Future<Output = SchoolResult<AuthIdentity>> + Send;
    fn find_by_value(
        &self,
        tenant_id: Uuid,
        kind: IdentityKind,
        value: &str,
    ) -> impl Future<Output = SchoolResult<Option<AuthIdentity>>> + Send;
    fn list_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Vec<AuthIdentity>>> + Send;
    fn mark_verified(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SchoolResult<AuthIdentity>> + Send;
}

// ---------------------------------------------------------------------------
// Roles & permissions (global)
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = SchoolResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SchoolResult<Role>> + Send;
    /// Pure lookup; a missing role is `RoleNotFound`.
    fn get_by_name(&self, name: &str) -> impl Future<Output = SchoolResult<Role>> + Send;
    fn list(&self) -> impl Future<Output = SchoolResult<Vec<Role>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = SchoolResult<Permission>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = SchoolResult<Permission>> + Send;
    /// Fetch by name, creating the row if it is missing. A concurrent
    /// create of the same name is resolved by re-fetching.
    fn get_or_create(&self, name: &str) -> impl Future<Output = SchoolResult<Permission>> + Send;

    /// Grant a permission to a role (creates a `grants` edge).
    fn grant_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = SchoolResult<()>> + Send;
    fn revoke_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = SchoolResult<()>> + Send;
    fn get_role_permissions(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Vec<Permission>>> + Send;

    /// Grant a permission directly to a user, bypassing the role.
    fn grant_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = SchoolResult<()>> + Send;
    fn revoke_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = SchoolResult<()>> + Send;
    fn get_user_permissions(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Vec<Permission>>> + Send;
}

// ---------------------------------------------------------------------------
// Delegated administrators (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait AdminScopeRepository: Send + Sync {
    fn list_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SchoolResult<Vec<AdminScope>>> + Send;
    /// Replace every row of one kind; rows of the other kind are left
    /// untouched.
    fn replace_kind(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        kind: ScopeKind,
        target_ids: &[Uuid],
    ) -> impl Future<Output = SchoolResult<Vec<AdminScope>>> + Send;
}

pub trait DelegatedAdminRepository: Send + Sync {
    /// User, email identity, direct grants and scope rows in one
    /// transaction.
    fn create(
        &self,
        input: NewDelegatedAdmin,
    ) -> impl Future<Output = SchoolResult<User>> + Send;
    /// Apply name change and list replacements in one transaction.
    fn apply_changes(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        changes: DelegatedAdminChanges,
    ) -> impl Future<Output = SchoolResult<User>> + Send;
}
