//! SurrealDB implementation of [`EntitlementRepository`].
//!
//! Each (tenant, module) pair maps to the record id
//! `school_module:<tenant>_<module>`, so writes are single-record
//! UPSERTs and can never produce a second row for the same pair.

use chrono::{DateTime, Utc};
use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::module::SchoolModule;
use schoolhub_core::repository::EntitlementRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SchoolModuleRow {
    tenant_id: String,
    module_id: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SchoolModuleRow {
    fn try_into_entitlement(self) -> Result<SchoolModule, DbError> {
        Ok(SchoolModule {
            tenant_id: parse_uuid(&self.tenant_id, "tenant UUID")?,
            module_id: parse_uuid(&self.module_id, "module UUID")?,
            enabled: self.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub(crate) fn entitlement_key(tenant_id: Uuid, module_id: Uuid) -> String {
    format!("{tenant_id}_{module_id}")
}

/// SurrealDB implementation of the Entitlement repository.
#[derive(Clone)]
pub struct SurrealEntitlementRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEntitlementRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    fn first_row(rows: Vec<SchoolModuleRow>) -> Result<Option<SchoolModule>, DbError> {
        rows.into_iter()
            .next()
            .map(SchoolModuleRow::try_into_entitlement)
            .transpose()
    }
}

impl<C: Connection> EntitlementRepository for SurrealEntitlementRepository<C> {
    async fn upsert(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
        enabled: bool,
    ) -> SchoolResult<SchoolModule> {
        let result = self
            .db
            .query(
                "UPSERT type::record('school_module', $key) SET \
                 tenant_id = $tenant_id, module_id = $module_id, \
                 enabled = $enabled, updated_at = time::now()",
            )
            .bind(("key", entitlement_key(tenant_id, module_id)))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("module_id", module_id.to_string()))
            .bind(("enabled", enabled))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<SchoolModuleRow> = result.take(0).map_err(DbError::from)?;
        Self::first_row(rows)?.ok_or_else(|| {
            DbError::Query(format!(
                "upsert returned no row for tenant {tenant_id} module {module_id}"
            ))
            .into()
        })
    }

    async fn disable(&self, tenant_id: Uuid, module_id: Uuid) -> SchoolResult<SchoolModule> {
        // UPDATE on a missing record id yields no rows instead of creating one.
        let result = self
            .db
            .query(
                "UPDATE type::record('school_module', $key) SET \
                 enabled = false, updated_at = time::now()",
            )
            .bind(("key", entitlement_key(tenant_id, module_id)))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<SchoolModuleRow> = result.take(0).map_err(DbError::from)?;
        Self::first_row(rows)?.ok_or(SchoolError::EntitlementNotFound {
            tenant_id,
            module_id,
        })
    }

    async fn get(&self, tenant_id: Uuid, module_id: Uuid) -> SchoolResult<Option<SchoolModule>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('school_module', $key)")
            .bind(("key", entitlement_key(tenant_id, module_id)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SchoolModuleRow> = result.take(0).map_err(DbError::from)?;
        Ok(Self::first_row(rows)?)
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> SchoolResult<Vec<SchoolModule>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM school_module WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SchoolModuleRow> = result.take(0).map_err(DbError::from)?;
        let entitlements = rows
            .into_iter()
            .map(SchoolModuleRow::try_into_entitlement)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(entitlements)
    }
}
