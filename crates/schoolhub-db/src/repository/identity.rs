//! SurrealDB implementation of [`AuthIdentityRepository`].

use chrono::{DateTime, Utc};
use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::identity::{
    AuthIdentity, CreateAuthIdentity, IdentityKind, normalize_identity_value,
};
use schoolhub_core::repository::AuthIdentityRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{DbError, classify_errors};

pub(crate) const IDENTITY_VALUE_INDEX: &str = "idx_identity_value";

#[derive(Debug, SurrealValue)]
struct IdentityRow {
    record_id: String,
    tenant_id: String,
    user_id: String,
    kind: String,
    value: String,
    secret: String,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl IdentityRow {
    fn try_into_identity(self) -> Result<AuthIdentity, DbError> {
        let kind = IdentityKind::parse(&self.kind)
            .ok_or_else(|| DbError::decode("identity kind", &self.kind))?;
        Ok(AuthIdentity {
            id: parse_uuid(&self.record_id, "identity UUID")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant UUID")?,
            user_id: parse_uuid(&self.user_id, "user UUID")?,
            kind,
            value: self.value,
            secret: self.secret,
            verified: self.verified,
            created_at: self.created_at,
        })
    }
}

/// Map an index clash on identity values to the error callers expect.
pub(crate) fn identity_conflict(err: DbError, kind: IdentityKind, value: &str) -> SchoolError {
    if err.violates(IDENTITY_VALUE_INDEX) {
        return match kind {
            IdentityKind::Email => SchoolError::DuplicateEmail {
                email: value.to_string(),
            },
            other => SchoolError::AlreadyExists {
                entity: format!("{} identity '{value}'", other.as_str()),
            },
        };
    }
    err.into()
}

/// SurrealDB implementation of the AuthIdentity repository.
#[derive(Clone)]
pub struct SurrealAuthIdentityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuthIdentityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SchoolResult<AuthIdentity> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('auth_identity', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "auth_identity".into(),
            id: id_str,
        })?;
        Ok(row.try_into_identity()?)
    }
}

impl<C: Connection> AuthIdentityRepository for SurrealAuthIdentityRepository<C> {
    async fn create(&self, input: CreateAuthIdentity) -> SchoolResult<AuthIdentity> {
        let id = Uuid::new_v4();
        let value = normalize_identity_value(input.kind, &input.value);

        let mut response = self
            .db
            .query(
                "CREATE type::record('auth_identity', $id) SET \
                 tenant_id = $tenant_id, user_id = $user_id, kind = $kind, \
                 value = $value, secret = $secret, verified = $verified",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("kind", input.kind.as_str().to_string()))
            .bind(("value", value.clone()))
            .bind(("secret", input.secret))
            .bind(("verified", input.verified))
            .await
            .map_err(DbError::from)?;

        if let Some(err) = classify_errors(response.take_errors()) {
            return Err(identity_conflict(err, input.kind, &value));
        }

        self.get_by_id(input.tenant_id, id).await
    }

    async fn find_by_value(
        &self,
        tenant_id: Uuid,
        kind: IdentityKind,
        value: &str,
    ) -> SchoolResult<Option<AuthIdentity>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM auth_identity \
                 WHERE tenant_id = $tenant_id AND kind = $kind AND value = $value \
                 LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("kind", kind.as_str().to_string()))
            .bind(("value", normalize_identity_value(kind, value)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_identity()?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, tenant_id: Uuid, user_id: Uuid) -> SchoolResult<Vec<AuthIdentity>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM auth_identity \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        let identities = rows
            .into_iter()
            .map(IdentityRow::try_into_identity)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(identities)
    }

    async fn mark_verified(&self, tenant_id: Uuid, id: Uuid) -> SchoolResult<AuthIdentity> {
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query(
                "UPDATE type::record('auth_identity', $id) SET verified = true \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(tenant_id, id).await
    }
}
