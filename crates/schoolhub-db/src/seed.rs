//! Idempotent seeding of the global catalogs.
//!
//! Well-known roles and the module catalog are created once per
//! deployment. Runtime code only reads them and fails with
//! `RoleNotFound` when seeding was skipped.

use std::collections::HashSet;

use surrealdb::{Connection, Surreal};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, classify_errors};

/// Role given to the first user of every provisioned tenant.
pub const SCHOOL_ADMIN_ROLE: &str = "SCHOOL_ADMIN";
/// Role given to delegated (scope-restricted) administrators.
pub const DELEGATED_ADMIN_ROLE: &str = "DELEGATED_ADMIN";

#[derive(Debug, Clone)]
pub struct SeedRole {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SeedModule {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SeedData {
    pub roles: Vec<SeedRole>,
    pub modules: Vec<SeedModule>,
}

/// Counts of rows created by one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub permissions_created: usize,
    pub grants_created: usize,
    pub modules_created: usize,
}

const DEFAULT_MODULES: &[(&str, &str)] = &[
    ("ADMISSIONS", "Admissions"),
    ("ATTENDANCE", "Attendance"),
    ("CIRCULARS", "Circulars"),
    ("DEPARTMENTS", "Departments"),
    ("EVENTS", "Events"),
    ("EXAMS", "Exams"),
    ("FEES", "Fees"),
    ("HOMEWORK", "Homework"),
    ("HOSTEL", "Hostel"),
    ("INVENTORY", "Inventory"),
    ("LEAVE_MANAGEMENT", "Leave Management"),
    ("LIBRARY", "Library"),
    ("MESSAGING", "Messaging"),
    ("PAYROLL", "Payroll"),
    ("REPORT_CARDS", "Report Cards"),
    ("SUBSTITUTION", "Substitution"),
    ("SYLLABUS", "Syllabus"),
    ("TIMETABLE", "Timetable"),
    ("TRANSPORT", "Transport"),
    ("VISITOR_MANAGEMENT", "Visitor Management"),
];

impl Default for SeedData {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            roles: vec![
                SeedRole {
                    name: SCHOOL_ADMIN_ROLE.into(),
                    description: "Full administrator of a school".into(),
                    permissions: owned(&[
                        "MANAGE_ACADEMIC_YEARS",
                        "MANAGE_MODULES",
                        "MANAGE_ADMINS",
                        "VIEW_STUDENTS",
                        "EDIT_STUDENTS",
                    ]),
                },
                SeedRole {
                    name: DELEGATED_ADMIN_ROLE.into(),
                    description: "Administrator limited to granted permissions and scopes".into(),
                    permissions: Vec::new(),
                },
                SeedRole {
                    name: "TEACHER".into(),
                    description: "Teaching staff".into(),
                    permissions: owned(&["VIEW_STUDENTS", "MARK_ATTENDANCE"]),
                },
            ],
            modules: DEFAULT_MODULES
                .iter()
                .map(|(key, name)| SeedModule {
                    key: (*key).into(),
                    name: (*name).into(),
                })
                .collect(),
        }
    }
}

async fn existing_names<C: Connection>(
    db: &Surreal<C>,
    query: &'static str,
) -> Result<HashSet<String>, DbError> {
    let mut result = db.query(query).await?;
    let names: Vec<String> = result.take(0)?;
    Ok(names.into_iter().collect())
}

/// Run a single-row CREATE, treating a unique-index clash as "someone
/// else seeded it first".
async fn create_if_absent<C: Connection>(
    db: &Surreal<C>,
    query: &str,
    binds: Vec<(&'static str, String)>,
) -> Result<bool, DbError> {
    let mut builder = db.query(query.to_string());
    for bind in binds {
        builder = builder.bind(bind);
    }
    let mut response = builder.await?;
    match classify_errors(response.take_errors()) {
        None => Ok(true),
        Some(DbError::UniqueViolation { .. }) => Ok(false),
        Some(other) => Err(other),
    }
}

/// Create whatever part of `data` is missing. Safe to run repeatedly.
pub async fn seed_defaults<C: Connection>(
    db: &Surreal<C>,
    data: &SeedData,
) -> Result<SeedReport, DbError> {
    let mut report = SeedReport::default();

    let roles = existing_names(db, "SELECT VALUE name FROM role").await?;
    for role in data.roles.iter().filter(|r| !roles.contains(&r.name)) {
        if create_if_absent(
            db,
            "CREATE type::record('role', $id) SET name = $name, description = $description",
            vec![
                ("id", Uuid::new_v4().to_string()),
                ("name", role.name.clone()),
                ("description", role.description.clone()),
            ],
        )
        .await?
        {
            debug!(role = %role.name, "Seeded role");
            report.roles_created += 1;
        }
    }

    let permissions = existing_names(db, "SELECT VALUE name FROM permission").await?;
    let wanted: HashSet<&String> = data.roles.iter().flat_map(|r| &r.permissions).collect();
    for name in wanted.into_iter().filter(|p| !permissions.contains(*p)) {
        if create_if_absent(
            db,
            "CREATE type::record('permission', $id) SET name = $name, description = ''",
            vec![("id", Uuid::new_v4().to_string()), ("name", name.clone())],
        )
        .await?
        {
            report.permissions_created += 1;
        }
    }

    for role in &data.roles {
        for permission in &role.permissions {
            let mut existing = db
                .query(
                    "SELECT VALUE meta::id(id) FROM grants \
                     WHERE in.name = $role AND out.name = $permission",
                )
                .bind(("role", role.name.clone()))
                .bind(("permission", permission.clone()))
                .await?;
            let edges: Vec<String> = existing.take(0)?;
            if !edges.is_empty() {
                continue;
            }

            let mut result = db
                .query(
                    "LET $r = (SELECT VALUE id FROM role WHERE name = $role)[0]; \
                     LET $p = (SELECT VALUE id FROM permission WHERE name = $permission)[0]; \
                     RELATE $r->grants->$p;",
                )
                .bind(("role", role.name.clone()))
                .bind(("permission", permission.clone()))
                .await?;
            if let Some(err) = classify_errors(result.take_errors()) {
                return Err(err);
            }
            report.grants_created += 1;
        }
    }

    let modules = existing_names(db, "SELECT VALUE key FROM module").await?;
    for module in data.modules.iter().filter(|m| !modules.contains(&m.key)) {
        if create_if_absent(
            db,
            "CREATE type::record('module', $id) SET key = $key, name = $name",
            vec![
                ("id", Uuid::new_v4().to_string()),
                ("key", module.key.clone()),
                ("name", module.name.clone()),
            ],
        )
        .await?
        {
            report.modules_created += 1;
        }
    }

    info!(
        roles = report.roles_created,
        permissions = report.permissions_created,
        grants = report.grants_created,
        modules = report.modules_created,
        "Catalog seeding complete"
    );
    Ok(report)
}
