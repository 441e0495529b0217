//! Delegated school administrators: users holding the delegated role,
//! a hand-picked set of direct permissions and optional class/section
//! restrictions.

use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::admin::{
    AdminSummary, CreateDelegatedAdminRequest, DelegatedAdminChanges, NewDelegatedAdmin,
    UpdateDelegatedAdminRequest,
};
use schoolhub_core::models::identity::{IdentityKind, normalize_identity_value};
use schoolhub_core::models::role::Role;
use schoolhub_core::models::scope::{AdminScopeSet, ScopeTarget};
use schoolhub_core::models::user::User;
use schoolhub_core::repository::{
    AdminScopeRepository, AuthIdentityRepository, DelegatedAdminRepository, PermissionRepository,
    RoleRepository, UserRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::password;
use crate::provisioning::{check_password_policy, validate_email};

pub struct DelegatedAdminService<D, U, R, P, I, S>
where
    D: DelegatedAdminRepository,
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
    I: AuthIdentityRepository,
    S: AdminScopeRepository,
{
    admin_repo: D,
    user_repo: U,
    role_repo: R,
    permission_repo: P,
    identity_repo: I,
    scope_repo: S,
    config: ServiceConfig,
}

impl<D, U, R, P, I, S> DelegatedAdminService<D, U, R, P, I, S>
where
    D: DelegatedAdminRepository,
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
    I: AuthIdentityRepository,
    S: AdminScopeRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        admin_repo: D,
        user_repo: U,
        role_repo: R,
        permission_repo: P,
        identity_repo: I,
        scope_repo: S,
        config: ServiceConfig,
    ) -> Self {
        Self {
            admin_repo,
            user_repo,
            role_repo,
            permission_repo,
            identity_repo,
            scope_repo,
            config,
        }
    }

    async fn delegated_role(&self) -> SchoolResult<Role> {
        self.role_repo
            .get_by_name(&self.config.delegated_admin_role)
            .await
    }

    async fn resolve_permissions(&self, names: &[String]) -> SchoolResult<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                return Err(SchoolError::validation("permission name must not be empty"));
            }
            let permission = self.permission_repo.get_or_create(name).await?;
            if !ids.contains(&permission.id) {
                ids.push(permission.id);
            }
        }
        Ok(ids)
    }

    /// The user, provided it exists in the tenant and holds the
    /// delegated role; anything else reads as not found.
    async fn load(&self, tenant_id: Uuid, user_id: Uuid) -> SchoolResult<User> {
        let user = self.user_repo.get_by_id(tenant_id, user_id).await?;
        let role = self.delegated_role().await?;
        if user.role_id != role.id {
            return Err(SchoolError::not_found("delegated_admin", user_id));
        }
        Ok(user)
    }

    async fn summarize(&self, user: User) -> SchoolResult<AdminSummary> {
        let email = self
            .identity_repo
            .list_for_user(user.tenant_id, user.id)
            .await?
            .into_iter()
            .find(|identity| identity.kind == IdentityKind::Email)
            .map(|identity| identity.value);
        let permissions = self
            .permission_repo
            .get_user_permissions(user.tenant_id, user.id)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();
        let scope = AdminScopeSet::from_rows(
            &self.scope_repo.list_for_user(user.tenant_id, user.id).await?,
        );

        Ok(AdminSummary {
            user,
            email,
            permissions,
            scope,
        })
    }

    /// Create a delegated administrator with its identity, grants and
    /// scope rows in one transaction.
    ///
    /// The email pre-check only makes the common case fail fast; the
    /// unique identity index decides races.
    pub async fn create(&self, request: CreateDelegatedAdminRequest) -> SchoolResult<AdminSummary> {
        if request.name.trim().is_empty() {
            return Err(SchoolError::validation("name must not be empty"));
        }
        validate_email(&request.email)?;
        if let Some(password) = &request.password {
            check_password_policy(password, self.config.min_password_length)?;
        }

        let email = normalize_identity_value(IdentityKind::Email, &request.email);
        if self
            .identity_repo
            .find_by_value(request.tenant_id, IdentityKind::Email, &email)
            .await?
            .is_some()
        {
            return Err(SchoolError::DuplicateEmail { email });
        }

        let user = self
            .create_inner(request, email)
            .await
            .map_err(SchoolError::into_provisioning_failure)?;

        info!(tenant_id = %user.tenant_id, user_id = %user.id, "Delegated admin created");
        self.summarize(user).await
    }

    async fn create_inner(
        &self,
        request: CreateDelegatedAdminRequest,
        email: String,
    ) -> SchoolResult<User> {
        let role = self.delegated_role().await?;
        let permission_ids = self.resolve_permissions(&request.permissions).await?;
        let secret = password::hash_password(
            request
                .password
                .as_deref()
                .unwrap_or(&self.config.default_admin_password),
            self.config.pepper.as_deref(),
        )?;

        let scopes = request
            .class_ids
            .iter()
            .copied()
            .map(ScopeTarget::Class)
            .chain(request.section_ids.iter().copied().map(ScopeTarget::Section))
            .collect();

        self.admin_repo
            .create(NewDelegatedAdmin {
                tenant_id: request.tenant_id,
                name: request.name.trim().to_string(),
                role_id: role.id,
                email,
                secret,
                permission_ids,
                scopes,
            })
            .await
    }

    /// Present lists fully replace what is stored. Class and section
    /// lists are replaced independently of each other.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        patch: UpdateDelegatedAdminRequest,
    ) -> SchoolResult<AdminSummary> {
        self.load(tenant_id, user_id).await?;

        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(SchoolError::validation("name must not be empty"));
            }
        }
        let permission_ids = match &patch.permissions {
            Some(names) => Some(self.resolve_permissions(names).await?),
            None => None,
        };

        let user = self
            .admin_repo
            .apply_changes(
                tenant_id,
                user_id,
                DelegatedAdminChanges {
                    name: patch.name.map(|n| n.trim().to_string()),
                    permission_ids,
                    class_ids: patch.class_ids,
                    section_ids: patch.section_ids,
                },
            )
            .await?;
        self.summarize(user).await
    }

    /// Delete the user; identities, grants and scope rows go with it.
    pub async fn remove(&self, tenant_id: Uuid, user_id: Uuid) -> SchoolResult<()> {
        self.load(tenant_id, user_id).await?;
        self.user_repo.delete(tenant_id, user_id).await?;
        info!(tenant_id = %tenant_id, user_id = %user_id, "Delegated admin removed");
        Ok(())
    }

    pub async fn get(&self, tenant_id: Uuid, user_id: Uuid) -> SchoolResult<AdminSummary> {
        let user = self.load(tenant_id, user_id).await?;
        self.summarize(user).await
    }

    pub async fn list(&self, tenant_id: Uuid) -> SchoolResult<Vec<AdminSummary>> {
        let role = self.delegated_role().await?;
        let users = self.user_repo.list_by_role(tenant_id, role.id).await?;

        let mut summaries = Vec::with_capacity(users.len());
        for user in users {
            summaries.push(self.summarize(user).await?);
        }
        Ok(summaries)
    }
}
