//! SurrealDB implementation of [`PermissionRepository`].
//!
//! Role grants are `role -> grants -> permission` edges; direct user
//! grants are `user -> has_permission -> permission` edges. Both are
//! written at most once per pair.

use chrono::{DateTime, Utc};
use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::permission::{CreatePermission, Permission};
use schoolhub_core::repository::PermissionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{DbError, classify_errors};

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl PermissionRow {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        Ok(Permission {
            id: parse_uuid(&self.record_id, "permission UUID")?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

fn into_permissions(rows: Vec<PermissionRow>) -> Result<Vec<Permission>, DbError> {
    rows.into_iter()
        .map(PermissionRow::try_into_permission)
        .collect()
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by_name(&self, name: &str) -> SchoolResult<Option<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE name = $name LIMIT 1",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_permission()?)),
            None => Ok(None),
        }
    }

    /// Direct grants are tenant-scoped through their user.
    async fn ensure_user(&self, tenant_id: Uuid, user_id: Uuid) -> SchoolResult<()> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM type::record('user', $user_id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        if ids.is_empty() {
            return Err(SchoolError::not_found("user", user_id));
        }
        Ok(())
    }

    async fn edge_exists(&self, edge: &str, from: String, to: String) -> SchoolResult<bool> {
        let mut result = self
            .db
            .query(format!(
                "SELECT VALUE meta::id(id) FROM {edge} WHERE in = {from} AND out = {to}"
            ))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(!ids.is_empty())
    }

    async fn relate_once(&self, edge: &str, from: String, to: String) -> SchoolResult<()> {
        if self.edge_exists(edge, from.clone(), to.clone()).await? {
            return Ok(());
        }

        self.db
            .query(format!("RELATE {from} -> {edge} -> {to};"))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}

fn role_ref(id: Uuid) -> String {
    format!("role:`{id}`")
}

fn user_ref(id: Uuid) -> String {
    format!("user:`{id}`")
}

fn permission_ref(id: Uuid) -> String {
    format!("permission:`{id}`")
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> SchoolResult<Permission> {
        let id = Uuid::new_v4();

        let mut response = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        if let Some(err) = classify_errors(response.take_errors()) {
            if err.violates("idx_permission_name") {
                return Err(SchoolError::AlreadyExists {
                    entity: format!("permission '{}'", input.name),
                });
            }
            return Err(err.into());
        }

        self.get_by_name(&input.name).await
    }

    async fn get_by_name(&self, name: &str) -> SchoolResult<Permission> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| SchoolError::not_found("permission", name))
    }

    async fn get_or_create(&self, name: &str) -> SchoolResult<Permission> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing);
        }

        let created = self
            .create(CreatePermission {
                name: name.to_string(),
                description: String::new(),
            })
            .await;

        match created {
            Ok(permission) => Ok(permission),
            // Lost a race with another writer; theirs is as good as ours.
            Err(SchoolError::AlreadyExists { .. }) => self.get_by_name(name).await,
            Err(e) => Err(e),
        }
    }

    async fn grant_to_role(&self, role_id: Uuid, permission_id: Uuid) -> SchoolResult<()> {
        self.relate_once("grants", role_ref(role_id), permission_ref(permission_id))
            .await
    }

    async fn revoke_from_role(&self, role_id: Uuid, permission_id: Uuid) -> SchoolResult<()> {
        self.db
            .query(
                "DELETE grants WHERE \
                 in = type::record('role', $role_id) AND \
                 out = type::record('permission', $perm_id)",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("perm_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_role_permissions(&self, role_id: Uuid) -> SchoolResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 ) ORDER BY name ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_permissions(rows)?)
    }

    async fn grant_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> SchoolResult<()> {
        self.ensure_user(tenant_id, user_id).await?;
        self.relate_once(
            "has_permission",
            user_ref(user_id),
            permission_ref(permission_id),
        )
        .await
    }

    async fn revoke_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> SchoolResult<()> {
        self.ensure_user(tenant_id, user_id).await?;

        self.db
            .query(
                "DELETE has_permission WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('permission', $perm_id)",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("perm_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_user_permissions(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> SchoolResult<Vec<Permission>> {
        self.ensure_user(tenant_id, user_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM has_permission \
                     WHERE in = type::record('user', $user_id)\
                 ) ORDER BY name ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_permissions(rows)?)
    }
}
