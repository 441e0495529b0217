//! SurrealDB implementation of [`UserRepository`].
//!
//! Users carry no credentials; those live on `auth_identity` rows.

use chrono::{DateTime, Utc};
use schoolhub_core::error::SchoolResult;
use schoolhub_core::models::user::{CreateUser, UpdateUser, User};
use schoolhub_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    tenant_id: String,
    name: String,
    role_id: String,
    is_active: bool,
    photo: Option<String>,
    last_seen_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user UUID")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant UUID")?,
            name: self.name,
            role_id: parse_uuid(&self.role_id, "role UUID")?,
            is_active: self.is_active,
            photo: self.photo,
            last_seen_at: self.last_seen_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> SchoolResult<User> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('user', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 role_id = $role_id, photo = $photo",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("role_id", input.role_id.to_string()))
            .bind(("photo", input.photo))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(input.tenant_id, id).await
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SchoolResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('user', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateUser) -> SchoolResult<User> {
        // Tenant ownership first; UPDATE with a WHERE miss is silent.
        self.get_by_id(tenant_id, id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.role_id.is_some() {
            sets.push("role_id = $role_id");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.photo.is_some() {
            sets.push("photo = $photo");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(role_id) = input.role_id {
            builder = builder.bind(("role_id", role_id.to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(photo) = input.photo {
            builder = builder.bind(("photo", photo));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(tenant_id, id).await
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SchoolResult<()> {
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query("DELETE type::record('user', $id) WHERE tenant_id = $tenant_id")
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_by_role(&self, tenant_id: Uuid, role_id: Uuid) -> SchoolResult<Vec<User>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE tenant_id = $tenant_id AND role_id = $role_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let users = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(users)
    }

    async fn touch_last_seen(&self, tenant_id: Uuid, id: Uuid) -> SchoolResult<()> {
        self.db
            .query(
                "UPDATE type::record('user', $id) SET last_seen_at = time::now() \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}
