//! SurrealDB implementation of [`DelegatedAdminRepository`].
//!
//! Creation and every update are single transactions, so a delegated
//! administrator is never observable with half of its grants or
//! scope rows.

use schoolhub_core::error::SchoolResult;
use schoolhub_core::models::admin::{DelegatedAdminChanges, NewDelegatedAdmin};
use schoolhub_core::models::identity::{IdentityKind, normalize_identity_value};
use schoolhub_core::models::scope::ScopeKind;
use schoolhub_core::models::user::User;
use schoolhub_core::repository::{DelegatedAdminRepository, UserRepository};
use surrealdb::{Connection, Surreal};
use tracing::debug;
use uuid::Uuid;

use super::identity::identity_conflict;
use super::scope::{insert_scope_statements, replace_scope_statements};
use super::user::SurrealUserRepository;
use crate::error::{DbError, classify_errors};

fn grant_statements(user_id: Uuid, permission_ids: &[Uuid]) -> String {
    permission_ids
        .iter()
        .map(|pid| format!("RELATE user:`{user_id}` -> has_permission -> permission:`{pid}`;\n"))
        .collect()
}

/// SurrealDB implementation of the DelegatedAdmin repository.
#[derive(Clone)]
pub struct SurrealDelegatedAdminRepository<C: Connection> {
    db: Surreal<C>,
    users: SurrealUserRepository<C>,
}

impl<C: Connection> SurrealDelegatedAdminRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            users: SurrealUserRepository::new(db.clone()),
            db,
        }
    }
}

impl<C: Connection> DelegatedAdminRepository for SurrealDelegatedAdminRepository<C> {
    async fn create(&self, input: NewDelegatedAdmin) -> SchoolResult<User> {
        let user_id = Uuid::new_v4();
        let email = normalize_identity_value(IdentityKind::Email, &input.email);

        let mut script = String::from(
            "BEGIN TRANSACTION;\n\
             CREATE type::record('user', $user_id) SET \
             tenant_id = $tenant_id, name = $name, role_id = $role_id;\n\
             CREATE type::record('auth_identity', $identity_id) SET \
             tenant_id = $tenant_id, user_id = $user_id, kind = 'Email', \
             value = $email, secret = $secret, verified = true;\n",
        );
        script.push_str(&grant_statements(user_id, &input.permission_ids));
        script.push_str(&insert_scope_statements(
            input.tenant_id,
            user_id,
            input.scopes.iter().copied(),
        ));
        script.push_str("COMMIT TRANSACTION;");

        let mut response = self
            .db
            .query(script)
            .bind(("user_id", user_id.to_string()))
            .bind(("identity_id", Uuid::new_v4().to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("role_id", input.role_id.to_string()))
            .bind(("email", email.clone()))
            .bind(("secret", input.secret))
            .await
            .map_err(DbError::from)?;

        if let Some(err) = classify_errors(response.take_errors()) {
            return Err(identity_conflict(err, IdentityKind::Email, &email));
        }

        debug!(
            tenant_id = %input.tenant_id,
            user_id = %user_id,
            grants = input.permission_ids.len(),
            scopes = input.scopes.len(),
            "Delegated admin created"
        );
        self.users.get_by_id(input.tenant_id, user_id).await
    }

    async fn apply_changes(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        changes: DelegatedAdminChanges,
    ) -> SchoolResult<User> {
        self.users.get_by_id(tenant_id, user_id).await?;

        let mut script = String::from("BEGIN TRANSACTION;\n");
        if changes.name.is_some() {
            script.push_str(
                "UPDATE type::record('user', $user_id) SET \
                 name = $name, updated_at = time::now();\n",
            );
        }
        if let Some(permission_ids) = &changes.permission_ids {
            script.push_str("DELETE has_permission WHERE in = type::record('user', $user_id);\n");
            script.push_str(&grant_statements(user_id, permission_ids));
        }
        for kind in [ScopeKind::Class, ScopeKind::Section] {
            if let Some(target_ids) = changes.scope_replacement(kind) {
                script.push_str(&replace_scope_statements(tenant_id, user_id, kind, target_ids));
            }
        }
        script.push_str("COMMIT TRANSACTION;");

        let mut builder = self
            .db
            .query(script)
            .bind(("user_id", user_id.to_string()));
        if let Some(name) = changes.name {
            builder = builder.bind(("name", name));
        }

        let mut response = builder.await.map_err(DbError::from)?;
        if let Some(err) = classify_errors(response.take_errors()) {
            return Err(err.into());
        }

        self.users.get_by_id(tenant_id, user_id).await
    }
}
