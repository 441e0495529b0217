//! SurrealDB implementation of [`ModuleRepository`].

use chrono::{DateTime, Utc};
use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::module::{CreateModule, Module, display_name_for_key};
use schoolhub_core::repository::ModuleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{DbError, classify_errors};

#[derive(Debug, SurrealValue)]
struct ModuleRow {
    record_id: String,
    key: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl ModuleRow {
    fn try_into_module(self) -> Result<Module, DbError> {
        Ok(Module {
            id: parse_uuid(&self.record_id, "module UUID")?,
            key: self.key,
            name: self.name,
            created_at: self.created_at,
        })
    }
}

fn into_modules(rows: Vec<ModuleRow>) -> Result<Vec<Module>, DbError> {
    rows.into_iter().map(ModuleRow::try_into_module).collect()
}

/// SurrealDB implementation of the Module repository.
#[derive(Clone)]
pub struct SurrealModuleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealModuleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ModuleRepository for SurrealModuleRepository<C> {
    async fn create(&self, input: CreateModule) -> SchoolResult<Module> {
        let id = Uuid::new_v4();
        let name = input
            .name
            .unwrap_or_else(|| display_name_for_key(&input.key));

        let mut response = self
            .db
            .query("CREATE type::record('module', $id) SET key = $key, name = $name")
            .bind(("id", id.to_string()))
            .bind(("key", input.key.clone()))
            .bind(("name", name))
            .await
            .map_err(DbError::from)?;

        match classify_errors(response.take_errors()) {
            None => {}
            Some(err) if err.violates("idx_module_key") => {
                return Err(SchoolError::DuplicateModule { key: input.key });
            }
            Some(err) => return Err(err.into()),
        }

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> SchoolResult<Module> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('module', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or(SchoolError::ModuleNotFound(id))?;
        Ok(row.try_into_module()?)
    }

    async fn get_by_key(&self, key: &str) -> SchoolResult<Module> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM module WHERE key = $key LIMIT 1")
            .bind(("key", key.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SchoolError::not_found("module", format!("key={key}")))?;
        Ok(row.try_into_module()?)
    }

    async fn get_by_keys(&self, keys: &[String]) -> SchoolResult<Vec<Module>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM module \
                 WHERE key IN $keys ORDER BY key ASC",
            )
            .bind(("keys", keys.to_vec()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_modules(rows)?)
    }

    async fn list(&self) -> SchoolResult<Vec<Module>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM module ORDER BY key ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModuleRow> = result.take(0).map_err(DbError::from)?;
        Ok(into_modules(rows)?)
    }
}
