//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::role::{CreateRole, Role};
use schoolhub_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{DbError, classify_errors};

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid(&self.record_id, "role UUID")?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> SchoolResult<Role> {
        let id = Uuid::new_v4();

        let mut response = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        match classify_errors(response.take_errors()) {
            None => self.get_by_id(id).await,
            Some(err) if err.violates("idx_role_name") => Err(SchoolError::AlreadyExists {
                entity: format!("role '{}'", input.name),
            }),
            Some(err) => Err(err.into()),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> SchoolResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;
        Ok(row.try_into_role()?)
    }

    async fn get_by_name(&self, name: &str) -> SchoolResult<Role> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM role WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SchoolError::RoleNotFound {
                name: name.to_string(),
            })?;
        Ok(row.try_into_role()?)
    }

    async fn list(&self) -> SchoolResult<Vec<Role>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM role ORDER BY name ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let roles = rows
            .into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(roles)
    }
}
