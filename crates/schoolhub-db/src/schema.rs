//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings. Enums are stored as strings with ASSERT constraints.
//! Ownership cascades are DELETE events rather than per-call cleanup.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "ownership_cascades",
        sql: SCHEMA_V2,
    },
    Migration {
        version: 3,
        name: "active_year_lock",
        sql: SCHEMA_V3,
    },
];

// -----------------------------------------------------------------------
// Schema v1: tables and indexes
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (schools; global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD code ON TABLE tenant TYPE string;
DEFINE FIELD subdomain ON TABLE tenant TYPE string;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD kind ON TABLE tenant TYPE string \
    ASSERT $value IN ['School', 'College', 'Coaching'];
DEFINE FIELD is_active ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_code ON TABLE tenant COLUMNS code UNIQUE;
DEFINE INDEX idx_tenant_subdomain ON TABLE tenant COLUMNS subdomain UNIQUE;

-- =======================================================================
-- Academic years (tenant scope)
-- =======================================================================
DEFINE TABLE academic_year SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE academic_year TYPE string;
DEFINE FIELD name ON TABLE academic_year TYPE string;
DEFINE FIELD start_date ON TABLE academic_year TYPE datetime;
DEFINE FIELD end_date ON TABLE academic_year TYPE datetime;
DEFINE FIELD status ON TABLE academic_year TYPE string \
    ASSERT $value IN ['Planned', 'Active', 'Archived'];
DEFINE FIELD created_at ON TABLE academic_year TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE academic_year TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_year_tenant_status ON TABLE academic_year \
    COLUMNS tenant_id, status;

-- =======================================================================
-- Module catalog (global scope)
-- =======================================================================
DEFINE TABLE module SCHEMAFULL;
DEFINE FIELD key ON TABLE module TYPE string;
DEFINE FIELD name ON TABLE module TYPE string;
DEFINE FIELD created_at ON TABLE module TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_module_key ON TABLE module COLUMNS key UNIQUE;

-- =======================================================================
-- Entitlements: one row per (tenant, module)
-- =======================================================================
DEFINE TABLE school_module SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE school_module TYPE string;
DEFINE FIELD module_id ON TABLE school_module TYPE string;
DEFINE FIELD enabled ON TABLE school_module TYPE bool;
DEFINE FIELD created_at ON TABLE school_module TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE school_module TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_school_module_pair ON TABLE school_module \
    COLUMNS tenant_id, module_id UNIQUE;

-- =======================================================================
-- Roles & permissions (global scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_name ON TABLE permission COLUMNS name UNIQUE;

-- =======================================================================
-- Users (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD role_id ON TABLE user TYPE string;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD photo ON TABLE user TYPE option<string>;
DEFINE FIELD last_seen_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_role ON TABLE user COLUMNS tenant_id, role_id;

-- =======================================================================
-- Authentication identities (tenant scope)
-- =======================================================================
DEFINE TABLE auth_identity SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE auth_identity TYPE string;
DEFINE FIELD user_id ON TABLE auth_identity TYPE string;
DEFINE FIELD kind ON TABLE auth_identity TYPE string \
    ASSERT $value IN ['Email', 'Phone', 'Username'];
DEFINE FIELD value ON TABLE auth_identity TYPE string;
DEFINE FIELD secret ON TABLE auth_identity TYPE string;
DEFINE FIELD verified ON TABLE auth_identity TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE auth_identity TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_identity_value ON TABLE auth_identity \
    COLUMNS tenant_id, kind, value UNIQUE;
DEFINE INDEX idx_identity_user ON TABLE auth_identity \
    COLUMNS tenant_id, user_id;

-- =======================================================================
-- Delegated administrator scope rows (tenant scope)
-- =======================================================================
DEFINE TABLE admin_scope SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE admin_scope TYPE string;
DEFINE FIELD user_id ON TABLE admin_scope TYPE string;
DEFINE FIELD kind ON TABLE admin_scope TYPE string \
    ASSERT $value IN ['Class', 'Section'];
DEFINE FIELD target_id ON TABLE admin_scope TYPE string;
DEFINE FIELD created_at ON TABLE admin_scope TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_admin_scope_user ON TABLE admin_scope \
    COLUMNS tenant_id, user_id;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- Role -> Permission grants
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;

-- User -> Permission direct grants
DEFINE TABLE has_permission TYPE RELATION SCHEMAFULL;
";

// -----------------------------------------------------------------------
// Schema v2: ownership cascades
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE EVENT user_owned_rows ON TABLE user WHEN $event = 'DELETE' THEN {
    DELETE auth_identity WHERE user_id = meta::id($before.id);
    DELETE admin_scope WHERE user_id = meta::id($before.id);
    DELETE has_permission WHERE in = $before.id;
};

DEFINE EVENT tenant_owned_rows ON TABLE tenant WHEN $event = 'DELETE' THEN {
    DELETE user WHERE tenant_id = meta::id($before.id);
    DELETE academic_year WHERE tenant_id = meta::id($before.id);
    DELETE school_module WHERE tenant_id = meta::id($before.id);
    DELETE auth_identity WHERE tenant_id = meta::id($before.id);
    DELETE admin_scope WHERE tenant_id = meta::id($before.id);
};

DEFINE EVENT permission_edges ON TABLE permission WHEN $event = 'DELETE' THEN {
    DELETE grants WHERE out = $before.id;
    DELETE has_permission WHERE out = $before.id;
};
";

// -----------------------------------------------------------------------
// Schema v3: per-tenant activation lock
// -----------------------------------------------------------------------

// One row per tenant, keyed by tenant id. Every transaction that makes a
// year Active writes it, so concurrent activations collide on commit.
const SCHEMA_V3: &str = "\
DEFINE TABLE active_year_lock SCHEMAFULL;
DEFINE FIELD year_id ON TABLE active_year_lock TYPE string;
DEFINE FIELD updated_at ON TABLE active_year_lock TYPE datetime \
    VALUE time::now();

DEFINE EVENT tenant_active_year_lock ON TABLE tenant WHEN $event = 'DELETE' THEN {
    DELETE type::record('active_year_lock', meta::id($before.id));
};
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    info!(
        version = MIGRATIONS.last().map(|m| m.version).unwrap_or(0),
        "Schema is up to date"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn uniqueness_is_declared_for_natural_keys() {
        for index in [
            "idx_tenant_code",
            "idx_tenant_subdomain",
            "idx_module_key",
            "idx_school_module_pair",
            "idx_identity_value",
        ] {
            let line = SCHEMA_V1
                .lines()
                .position(|l| l.contains(index))
                .unwrap_or_else(|| panic!("{index} missing"));
            let decl: String = SCHEMA_V1.lines().skip(line).take(2).collect();
            assert!(decl.contains("UNIQUE"), "{index} must be UNIQUE");
        }
    }
}
