//! Permission resolution and self-service profile assembly.

use std::collections::BTreeSet;

use schoolhub_core::error::SchoolResult;
use schoolhub_core::models::authority::EffectiveAuthority;
use schoolhub_core::models::identity::IdentityKind;
use schoolhub_core::models::profile::{TenantBrief, UserProfile};
use schoolhub_core::models::scope::AdminScopeSet;
use schoolhub_core::repository::{
    AdminScopeRepository, AuthIdentityRepository, PermissionRepository, RoleRepository,
    TenantRepository, UserRepository,
};
use tracing::warn;
use uuid::Uuid;

/// Resolves what a user may do (permission names) and where (scope).
pub struct PermissionService<U, P, S>
where
    U: UserRepository,
    P: PermissionRepository,
    S: AdminScopeRepository,
{
    user_repo: U,
    permission_repo: P,
    scope_repo: S,
}

impl<U, P, S> PermissionService<U, P, S>
where
    U: UserRepository,
    P: PermissionRepository,
    S: AdminScopeRepository,
{
    pub fn new(user_repo: U, permission_repo: P, scope_repo: S) -> Self {
        Self {
            user_repo,
            permission_repo,
            scope_repo,
        }
    }

    /// Names granted through the user's role and directly, in that
    /// order. A user of another tenant is `NotFound`.
    async fn grant_names(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> SchoolResult<(Vec<String>, Vec<String>)> {
        let user = self.user_repo.get_by_id(tenant_id, user_id).await?;
        let role_permissions = self
            .permission_repo
            .get_role_permissions(user.role_id)
            .await?;
        let direct = self
            .permission_repo
            .get_user_permissions(tenant_id, user_id)
            .await?;

        Ok((
            role_permissions.into_iter().map(|p| p.name).collect(),
            direct.into_iter().map(|p| p.name).collect(),
        ))
    }

    /// Union of the role's permissions and the user's direct grants,
    /// collapsed by exact name.
    pub async fn resolve_effective_permissions(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> SchoolResult<BTreeSet<String>> {
        let (role, direct) = self.grant_names(tenant_id, user_id).await?;
        Ok(EffectiveAuthority::new(role, direct, AdminScopeSet::default()).permissions)
    }

    /// Capabilities plus the class/section extent they apply to.
    pub async fn authority(&self, tenant_id: Uuid, user_id: Uuid) -> SchoolResult<EffectiveAuthority> {
        let (role, direct) = self.grant_names(tenant_id, user_id).await?;
        let scopes = self.scope_repo.list_for_user(tenant_id, user_id).await?;
        Ok(EffectiveAuthority::new(
            role,
            direct,
            AdminScopeSet::from_rows(&scopes),
        ))
    }
}

/// Read-only composition of a user's profile. Viewing a profile also
/// records a last-seen timestamp, which is allowed to fail.
pub struct ProfileService<U, P, S, R, T, I>
where
    U: UserRepository + Clone,
    P: PermissionRepository,
    S: AdminScopeRepository,
    R: RoleRepository,
    T: TenantRepository,
    I: AuthIdentityRepository,
{
    user_repo: U,
    permissions: PermissionService<U, P, S>,
    role_repo: R,
    tenant_repo: T,
    identity_repo: I,
}

impl<U, P, S, R, T, I> ProfileService<U, P, S, R, T, I>
where
    U: UserRepository + Clone,
    P: PermissionRepository,
    S: AdminScopeRepository,
    R: RoleRepository,
    T: TenantRepository,
    I: AuthIdentityRepository,
{
    pub fn new(
        user_repo: U,
        permission_repo: P,
        scope_repo: S,
        role_repo: R,
        tenant_repo: T,
        identity_repo: I,
    ) -> Self {
        Self {
            permissions: PermissionService::new(user_repo.clone(), permission_repo, scope_repo),
            user_repo,
            role_repo,
            tenant_repo,
            identity_repo,
        }
    }

    pub async fn profile(&self, tenant_id: Uuid, user_id: Uuid) -> SchoolResult<UserProfile> {
        let user = self.user_repo.get_by_id(tenant_id, user_id).await?;
        let role = self.role_repo.get_by_id(user.role_id).await?;
        let tenant = self.tenant_repo.get_by_id(tenant_id).await?;
        let authority = self.permissions.authority(tenant_id, user_id).await?;
        let email = self
            .identity_repo
            .list_for_user(tenant_id, user_id)
            .await?
            .into_iter()
            .find(|identity| identity.kind == IdentityKind::Email)
            .map(|identity| identity.value);

        if let Err(e) = self.user_repo.touch_last_seen(tenant_id, user_id).await {
            warn!(tenant_id = %tenant_id, user_id = %user_id, error = %e, "Could not record profile view");
        }

        Ok(UserProfile {
            user,
            role_name: role.name,
            email,
            tenant: TenantBrief {
                id: tenant.id,
                code: tenant.code,
                name: tenant.name,
                kind: tenant.kind,
            },
            authority,
        })
    }
}
