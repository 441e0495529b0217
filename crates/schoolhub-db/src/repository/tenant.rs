//! SurrealDB implementation of [`TenantRepository`].
//!
//! Tenants are created only through provisioning; see
//! [`super::SurrealProvisioningRepository`].

use chrono::{DateTime, Utc};
use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::tenant::{Tenant, TenantKind, UpdateTenant};
use schoolhub_core::repository::{PaginatedResult, Pagination, TenantRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    record_id: String,
    code: String,
    subdomain: String,
    name: String,
    kind: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let kind = TenantKind::parse(&self.kind)
            .ok_or_else(|| DbError::decode("tenant kind", &self.kind))?;
        Ok(Tenant {
            id: parse_uuid(&self.record_id, "tenant UUID")?,
            code: self.code,
            subdomain: self.subdomain,
            name: self.name,
            kind,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_TENANT: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(
        &self,
        filter: &str,
        key: &'static str,
        value: String,
    ) -> SchoolResult<Option<Tenant>> {
        let mut result = self
            .db
            .query(format!("{SELECT_TENANT} tenant WHERE {filter} LIMIT 1"))
            .bind((key, value))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_tenant()?)),
            None => Ok(None),
        }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> SchoolResult<Tenant> {
        let mut result = self
            .db
            .query(format!("{SELECT_TENANT} type::record('tenant', $id)"))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or(SchoolError::TenantNotFound(id))?;

        Ok(row.try_into_tenant()?)
    }

    async fn get_by_code(&self, code: &str) -> SchoolResult<Tenant> {
        self.find_one("code = $code", "code", code.to_string())
            .await?
            .ok_or_else(|| SchoolError::not_found("tenant", format!("code={code}")))
    }

    async fn get_by_subdomain(&self, subdomain: &str) -> SchoolResult<Tenant> {
        self.find_one("subdomain = $subdomain", "subdomain", subdomain.to_string())
            .await?
            .ok_or_else(|| SchoolError::not_found("tenant", format!("subdomain={subdomain}")))
    }

    async fn update(&self, id: Uuid, input: UpdateTenant) -> SchoolResult<Tenant> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.kind.is_some() {
            sets.push("kind = $kind");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('tenant', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(kind) = input.kind {
            builder = builder.bind(("kind", kind.as_str().to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        // UPDATE on a missing record is a no-op; the read reports it.
        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> SchoolResult<()> {
        // Confirm existence so deleting an unknown tenant is reported.
        self.get_by_id(id).await?;

        self.db
            .query("DELETE type::record('tenant', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        tracing::warn!(tenant_id = %id, "Tenant deleted with all owned records");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> SchoolResult<PaginatedResult<Tenant>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM tenant GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "{SELECT_TENANT} tenant ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
