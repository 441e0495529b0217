//! SurrealDB implementation of [`ProvisioningRepository`].
//!
//! The whole tenant bundle is one SurrealQL transaction. Guards inside
//! the script `THROW` before any write when the code or subdomain is
//! taken or the administrator role was never seeded; the unique indexes
//! on `tenant` back the guard up under concurrency. Either way nothing
//! of the bundle survives a failure.

use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::identity::IdentityKind;
use schoolhub_core::models::provisioning::{
    ProvisionTenant, ProvisionedAdmin, ProvisionedYear, TenantSummary,
};
use schoolhub_core::repository::ProvisioningRepository;
use surrealdb::{Connection, Surreal};
use tracing::debug;
use uuid::Uuid;

use super::identity::identity_conflict;
use crate::error::{DbError, classify_errors};

const PROVISION_SCRIPT: &str = "\
BEGIN TRANSACTION;

LET $taken = (SELECT VALUE meta::id(id) FROM tenant
    WHERE code = $code OR subdomain = $subdomain);
IF array::len($taken) > 0 {
    THROW 'schoolhub:duplicate_tenant';
};

LET $role = (SELECT VALUE meta::id(id) FROM role WHERE name = $role_name);
IF array::len($role) = 0 {
    THROW string::concat('schoolhub:role_not_found:', $role_name);
};

CREATE type::record('tenant', $tenant_id) SET
    code = $code, subdomain = $subdomain, name = $name, kind = $kind;

CREATE type::record('academic_year', $year_id) SET
    tenant_id = $tenant_id, name = $year_name,
    start_date = $year_start, end_date = $year_end, status = 'Active';
UPSERT type::record('active_year_lock', $tenant_id) SET year_id = $year_id;

CREATE type::record('user', $user_id) SET
    tenant_id = $tenant_id, name = $admin_name, role_id = $role[0];

CREATE type::record('auth_identity', $identity_id) SET
    tenant_id = $tenant_id, user_id = $user_id, kind = $identity_kind,
    value = $admin_email, secret = $admin_secret, verified = true;

FOR $module_id IN $module_ids {
    UPSERT type::record('school_module', string::concat($tenant_id, '_', $module_id)) SET
        tenant_id = $tenant_id, module_id = $module_id,
        enabled = true, updated_at = time::now();
};

COMMIT TRANSACTION;
";

/// SurrealDB implementation of the Provisioning repository.
#[derive(Clone)]
pub struct SurrealProvisioningRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProvisioningRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

fn classify_failure(err: DbError, input: &ProvisionTenant) -> SchoolError {
    let duplicate = || SchoolError::DuplicateTenant {
        code: input.code.clone(),
        subdomain: input.subdomain.clone(),
    };

    if err.rejection_detail("duplicate_tenant").is_some() {
        return duplicate();
    }
    if let Some(name) = err.rejection_detail("role_not_found") {
        return SchoolError::RoleNotFound {
            name: name.to_string(),
        };
    }
    if err.violates("idx_tenant_code") || err.violates("idx_tenant_subdomain") {
        return duplicate();
    }
    identity_conflict(err, IdentityKind::Email, &input.admin_email)
}

impl<C: Connection> ProvisioningRepository for SurrealProvisioningRepository<C> {
    async fn provision_tenant(&self, input: ProvisionTenant) -> SchoolResult<TenantSummary> {
        let tenant_id = Uuid::new_v4();
        let year_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let identity_id = Uuid::new_v4();
        let module_ids: Vec<String> = input.module_ids.iter().map(Uuid::to_string).collect();

        let mut response = self
            .db
            .query(PROVISION_SCRIPT)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("year_id", year_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("identity_id", identity_id.to_string()))
            .bind(("code", input.code.clone()))
            .bind(("subdomain", input.subdomain.clone()))
            .bind(("name", input.name.clone()))
            .bind(("kind", input.kind.as_str().to_string()))
            .bind(("role_name", input.admin_role_name.clone()))
            .bind(("year_name", input.year_name.clone()))
            .bind(("year_start", input.year_start))
            .bind(("year_end", input.year_end))
            .bind(("admin_name", input.admin_name.clone()))
            .bind(("identity_kind", IdentityKind::Email.as_str().to_string()))
            .bind(("admin_email", input.admin_email.clone()))
            .bind(("admin_secret", input.admin_secret.clone()))
            .bind(("module_ids", module_ids))
            .await
            .map_err(DbError::from)?;

        if let Some(err) = classify_errors(response.take_errors()) {
            debug!(code = %input.code, error = %err, "Provisioning transaction rolled back");
            return Err(classify_failure(err, &input));
        }

        Ok(TenantSummary {
            tenant_id,
            code: input.code,
            admin: ProvisionedAdmin {
                user_id,
                email: input.admin_email,
            },
            academic_year: ProvisionedYear {
                id: year_id,
                name: input.year_name,
            },
            enabled_modules: Vec::new(),
        })
    }
}
