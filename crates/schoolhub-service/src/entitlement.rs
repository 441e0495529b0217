//! Module catalog and the per-tenant entitlement matrix.

use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::module::{
    CreateModule, EntitlementChange, EntitlementState, Module, SchoolModule, validate_module_key,
};
use schoolhub_core::repository::{EntitlementRepository, ModuleRepository, TenantRepository};
use tracing::{debug, warn};
use uuid::Uuid;

/// Result of a best-effort bulk update. Each change is applied on its
/// own; a failure does not undo the others.
#[derive(Debug, Default)]
pub struct BulkEntitlementOutcome {
    pub applied: Vec<SchoolModule>,
    pub failed: Vec<(Uuid, SchoolError)>,
}

impl BulkEntitlementOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct EntitlementService<T, M, E>
where
    T: TenantRepository,
    M: ModuleRepository,
    E: EntitlementRepository,
{
    tenant_repo: T,
    module_repo: M,
    entitlement_repo: E,
}

impl<T, M, E> EntitlementService<T, M, E>
where
    T: TenantRepository,
    M: ModuleRepository,
    E: EntitlementRepository,
{
    pub fn new(tenant_repo: T, module_repo: M, entitlement_repo: E) -> Self {
        Self {
            tenant_repo,
            module_repo,
            entitlement_repo,
        }
    }

    /// Add a module to the global catalog.
    pub async fn register_module(&self, input: CreateModule) -> SchoolResult<Module> {
        validate_module_key(&input.key)?;
        let module = self.module_repo.create(input).await?;
        debug!(module_id = %module.id, key = %module.key, "Module registered");
        Ok(module)
    }

    pub async fn list_modules(&self) -> SchoolResult<Vec<Module>> {
        self.module_repo.list().await
    }

    /// Enable or disable a module for a tenant. Repeating a call is a
    /// no-op in effect.
    pub async fn set_entitlement(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
        enabled: bool,
    ) -> SchoolResult<SchoolModule> {
        self.tenant_repo.get_by_id(tenant_id).await?;
        self.module_repo.get_by_id(module_id).await?;
        self.entitlement_repo.upsert(tenant_id, module_id, enabled).await
    }

    /// Turn off an entitlement that was provisioned before. Disabling a
    /// module the tenant never had is `EntitlementNotFound`.
    pub async fn disable_entitlement(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
    ) -> SchoolResult<SchoolModule> {
        self.entitlement_repo.disable(tenant_id, module_id).await
    }

    pub async fn set_entitlements(
        &self,
        tenant_id: Uuid,
        changes: &[EntitlementChange],
    ) -> SchoolResult<BulkEntitlementOutcome> {
        self.tenant_repo.get_by_id(tenant_id).await?;

        let mut outcome = BulkEntitlementOutcome::default();
        for change in changes {
            let applied = match self.module_repo.get_by_id(change.module_id).await {
                Ok(_) => {
                    self.entitlement_repo
                        .upsert(tenant_id, change.module_id, change.enabled)
                        .await
                }
                Err(e) => Err(e),
            };
            match applied {
                Ok(row) => outcome.applied.push(row),
                Err(e) => {
                    warn!(
                        tenant_id = %tenant_id,
                        module_id = %change.module_id,
                        error = %e,
                        "Entitlement change skipped"
                    );
                    outcome.failed.push((change.module_id, e));
                }
            }
        }
        Ok(outcome)
    }

    pub async fn list_entitlements(&self, tenant_id: Uuid) -> SchoolResult<Vec<SchoolModule>> {
        self.entitlement_repo.list_for_tenant(tenant_id).await
    }

    pub async fn entitlement_state(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
    ) -> SchoolResult<EntitlementState> {
        let row = self.entitlement_repo.get(tenant_id, module_id).await?;
        Ok(EntitlementState::from_row(row.as_ref()))
    }

    /// Boolean view for feature gates: unknown keys and modules never
    /// provisioned for the tenant both read as disabled.
    pub async fn is_enabled(&self, tenant_id: Uuid, key: &str) -> SchoolResult<bool> {
        let module = match self.module_repo.get_by_key(key).await {
            Ok(module) => module,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        Ok(self.entitlement_state(tenant_id, module.id).await?.is_enabled())
    }
}
