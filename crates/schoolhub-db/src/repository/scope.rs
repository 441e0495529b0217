//! SurrealDB implementation of [`AdminScopeRepository`].

use schoolhub_core::error::SchoolResult;
use schoolhub_core::models::scope::{AdminScope, ScopeKind, ScopeTarget};
use schoolhub_core::repository::AdminScopeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{DbError, classify_errors};

#[derive(Debug, SurrealValue)]
struct AdminScopeRow {
    record_id: String,
    tenant_id: String,
    user_id: String,
    kind: String,
    target_id: String,
}

impl AdminScopeRow {
    fn try_into_scope(self) -> Result<AdminScope, DbError> {
        let kind =
            ScopeKind::parse(&self.kind).ok_or_else(|| DbError::decode("scope kind", &self.kind))?;
        Ok(AdminScope {
            id: parse_uuid(&self.record_id, "scope UUID")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant UUID")?,
            user_id: parse_uuid(&self.user_id, "user UUID")?,
            target: ScopeTarget::from_parts(kind, parse_uuid(&self.target_id, "scope target UUID")?),
        })
    }
}

/// SurrealQL that deletes every scope row of `kind` for the user and
/// inserts one row per target. Meant to run inside a transaction.
///
/// All interpolated values are UUIDs or enum names.
pub(crate) fn replace_scope_statements(
    tenant_id: Uuid,
    user_id: Uuid,
    kind: ScopeKind,
    target_ids: &[Uuid],
) -> String {
    let mut sql = format!(
        "DELETE admin_scope WHERE tenant_id = '{tenant_id}' AND user_id = '{user_id}' \
         AND kind = '{}';\n",
        kind.as_str()
    );
    sql.push_str(&insert_scope_statements(
        tenant_id,
        user_id,
        target_ids.iter().map(|id| ScopeTarget::from_parts(kind, *id)),
    ));
    sql
}

pub(crate) fn insert_scope_statements(
    tenant_id: Uuid,
    user_id: Uuid,
    targets: impl IntoIterator<Item = ScopeTarget>,
) -> String {
    let mut sql = String::new();
    for target in targets {
        sql.push_str(&format!(
            "CREATE type::record('admin_scope', '{}') SET tenant_id = '{tenant_id}', \
             user_id = '{user_id}', kind = '{}', target_id = '{}';\n",
            Uuid::new_v4(),
            target.kind().as_str(),
            target.id()
        ));
    }
    sql
}

/// SurrealDB implementation of the AdminScope repository.
#[derive(Clone)]
pub struct SurrealAdminScopeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAdminScopeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AdminScopeRepository for SurrealAdminScopeRepository<C> {
    async fn list_for_user(&self, tenant_id: Uuid, user_id: Uuid) -> SchoolResult<Vec<AdminScope>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM admin_scope \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 ORDER BY kind ASC, target_id ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AdminScopeRow> = result.take(0).map_err(DbError::from)?;
        let scopes = rows
            .into_iter()
            .map(AdminScopeRow::try_into_scope)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(scopes)
    }

    async fn replace_kind(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        kind: ScopeKind,
        target_ids: &[Uuid],
    ) -> SchoolResult<Vec<AdminScope>> {
        let script = format!(
            "BEGIN TRANSACTION;\n{}COMMIT TRANSACTION;",
            replace_scope_statements(tenant_id, user_id, kind, target_ids)
        );

        let mut response = self.db.query(script).await.map_err(DbError::from)?;
        if let Some(err) = classify_errors(response.take_errors()) {
            return Err(err.into());
        }

        self.list_for_user(tenant_id, user_id).await
    }
}
