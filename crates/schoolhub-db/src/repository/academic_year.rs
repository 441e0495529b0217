//! SurrealDB implementation of [`AcademicYearRepository`].
//!
//! The single-active-year rule has no natural index, so every write that
//! can produce an active year runs its conflict check, a write to the
//! tenant's `active_year_lock` row and its mutation inside one
//! `BEGIN`/`COMMIT` script. Commit conflicts are retried.

use chrono::{DateTime, Utc};
use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::academic_year::{
    AcademicYear, AcademicYearName, AcademicYearStatus, CreateAcademicYear, UpdateAcademicYear,
};
use schoolhub_core::repository::AcademicYearRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{DbError, classify_errors};

const CONFLICT: &str = "conflicting_active_year";

#[derive(Debug, SurrealValue)]
struct AcademicYearRow {
    record_id: String,
    tenant_id: String,
    name: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AcademicYearRow {
    fn try_into_year(self) -> Result<AcademicYear, DbError> {
        let status = AcademicYearStatus::parse(&self.status)
            .ok_or_else(|| DbError::decode("academic year status", &self.status))?;
        Ok(AcademicYear {
            id: parse_uuid(&self.record_id, "academic year UUID")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant UUID")?,
            name: self.name,
            start_date: self.start_date,
            end_date: self.end_date,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct NameRow {
    name: String,
}

/// Guard shared by create and update: throws when another year of the
/// tenant is active. `$exclude` is the record being updated, or NONE.
///
/// The read alone cannot stop two concurrent activations, since each
/// writes a different year. Writing the tenant's lock row makes them
/// collide on commit, and the loser is retried against fresh state.
const ACTIVE_GUARD: &str = "\
IF $status = 'Active' {
    LET $active = (SELECT VALUE meta::id(id) FROM academic_year
        WHERE tenant_id = $tenant_id AND status = 'Active' AND meta::id(id) != $exclude
        LIMIT 1);
    IF array::len($active) > 0 {
        THROW string::concat('schoolhub:conflicting_active_year:', $active[0]);
    };
    UPSERT type::record('active_year_lock', $tenant_id) SET year_id = $id;
};
";

const INVALID_RANGE: &str = "invalid_date_range";

/// Attempts per write before a commit conflict is surfaced.
const MAX_ATTEMPTS: usize = 5;

/// SurrealDB implementation of the AcademicYear repository.
#[derive(Clone)]
pub struct SurrealAcademicYearRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAcademicYearRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Turn a thrown active-year conflict into the typed error, looking
    /// up the existing year's name for the message.
    async fn map_conflict(&self, tenant_id: Uuid, err: DbError) -> SchoolError {
        let Some(detail) = err.rejection_detail(CONFLICT) else {
            return err.into();
        };
        let existing_id = match Uuid::parse_str(detail.trim()) {
            Ok(id) => id,
            Err(e) => return DbError::decode("conflicting year UUID", e).into(),
        };
        self.conflicting(tenant_id, existing_id).await
    }

    async fn conflicting(&self, tenant_id: Uuid, existing_id: Uuid) -> SchoolError {
        let existing_name = match self.get_by_id(tenant_id, existing_id).await {
            Ok(year) => year.name,
            Err(_) => String::new(),
        };
        SchoolError::ConflictingActiveYear {
            existing_id,
            existing_name,
        }
    }

    /// Retries ran out on commit conflicts. Report whichever year won the
    /// activation race, or the raw conflict when none did.
    async fn exhausted(&self, tenant_id: Uuid, own_id: Uuid, err: DbError) -> SchoolError {
        match self.get_active(tenant_id).await {
            Ok(Some(active)) if active.id != own_id => {
                SchoolError::ConflictingActiveYear {
                    existing_id: active.id,
                    existing_name: active.name,
                }
            }
            _ => err.into(),
        }
    }

    async fn create_once(
        &self,
        id: Uuid,
        input: &CreateAcademicYear,
        status: AcademicYearStatus,
    ) -> Result<(), DbError> {
        let query = format!(
            "BEGIN TRANSACTION;\n{ACTIVE_GUARD}\
             CREATE type::record('academic_year', $id) SET \
             tenant_id = $tenant_id, name = $name, \
             start_date = $start_date, end_date = $end_date, \
             status = $status;\n\
             COMMIT TRANSACTION;"
        );

        let mut response = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("exclude", None::<String>))
            .bind(("name", input.name.clone()))
            .bind(("start_date", input.start_date))
            .bind(("end_date", input.end_date))
            .bind(("status", status.as_str().to_string()))
            .await?;

        match classify_errors(response.take_errors()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// One attempt at the patch. The date range is checked against the
    /// stored values inside the transaction, so two patches that each
    /// move one bound cannot jointly invert the range.
    async fn update_once(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: &UpdateAcademicYear,
    ) -> Result<(), DbError> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.start_date.is_some() {
            sets.push("start_date = $start_date");
        }
        if input.end_date.is_some() {
            sets.push("end_date = $end_date");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "BEGIN TRANSACTION;\n\
             LET $current = (SELECT start_date, end_date FROM type::record('academic_year', $id) \
                 WHERE tenant_id = $tenant_id)[0];\n\
             IF $current = NONE {{\n\
                 THROW 'schoolhub:not_found';\n\
             }};\n\
             IF ($end_date ?? $current.end_date) <= ($start_date ?? $current.start_date) {{\n\
                 THROW 'schoolhub:{INVALID_RANGE}';\n\
             }};\n\
             {ACTIVE_GUARD}\
             UPDATE type::record('academic_year', $id) SET {};\n\
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        // Without a status change the guard is skipped entirely.
        let status_bind = input
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();

        let mut response = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("exclude", Some(id.to_string())))
            .bind(("status", status_bind))
            .bind(("name", input.name.clone()))
            .bind(("start_date", input.start_date))
            .bind(("end_date", input.end_date))
            .await?;

        match classify_errors(response.take_errors()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The range the rejected patch would have produced, for the error.
    async fn invalid_range(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: &UpdateAcademicYear,
    ) -> SchoolError {
        match self.get_by_id(tenant_id, id).await {
            Ok(stored) => SchoolError::InvalidDateRange {
                start: input.start_date.unwrap_or(stored.start_date),
                end: input.end_date.unwrap_or(stored.end_date),
            },
            Err(err) => err,
        }
    }
}

impl<C: Connection> AcademicYearRepository for SurrealAcademicYearRepository<C> {
    async fn create(&self, input: CreateAcademicYear) -> SchoolResult<AcademicYear> {
        let id = Uuid::new_v4();
        let status = input.status.unwrap_or(AcademicYearStatus::Planned);

        let mut attempt = 1;
        loop {
            match self.create_once(id, &input, status).await {
                Ok(()) => break,
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    debug!(tenant_id = %input.tenant_id, attempt, "Retrying academic year create after conflict");
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    return Err(self.exhausted(input.tenant_id, id, err).await);
                }
                Err(err) => return Err(self.map_conflict(input.tenant_id, err).await),
            }
        }

        debug!(tenant_id = %input.tenant_id, year_id = %id, status = status.as_str(), "Academic year created");
        self.get_by_id(input.tenant_id, id).await
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SchoolResult<AcademicYear> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('academic_year', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AcademicYearRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "academic_year".into(),
            id: id_str,
        })?;

        Ok(row.try_into_year()?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateAcademicYear,
    ) -> SchoolResult<AcademicYear> {
        let mut attempt = 1;
        loop {
            match self.update_once(tenant_id, id, &input).await {
                Ok(()) => break,
                Err(err) if err.rejection_detail("not_found").is_some() => {
                    return Err(SchoolError::not_found("academic_year", id));
                }
                Err(err) if err.rejection_detail(INVALID_RANGE).is_some() => {
                    return Err(self.invalid_range(tenant_id, id, &input).await);
                }
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    debug!(tenant_id = %tenant_id, year_id = %id, attempt, "Retrying academic year update after conflict");
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    return Err(self.exhausted(tenant_id, id, err).await);
                }
                Err(err) => return Err(self.map_conflict(tenant_id, err).await),
            }
        }

        self.get_by_id(tenant_id, id).await
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> SchoolResult<Vec<AcademicYear>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM academic_year \
                 WHERE tenant_id = $tenant_id ORDER BY start_date ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AcademicYearRow> = result.take(0).map_err(DbError::from)?;
        let years = rows
            .into_iter()
            .map(|row| row.try_into_year())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(years)
    }

    async fn get_active(&self, tenant_id: Uuid) -> SchoolResult<Option<AcademicYear>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM academic_year \
                 WHERE tenant_id = $tenant_id AND status = 'Active' LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AcademicYearRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_year()?)),
            None => Ok(None),
        }
    }

    async fn list_distinct_names(&self) -> SchoolResult<Vec<AcademicYearName>> {
        let mut result = self
            .db
            .query(
                "SELECT name, time::max(created_at) AS latest FROM academic_year \
                 GROUP BY name ORDER BY latest DESC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NameRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| AcademicYearName { name: row.name })
            .collect())
    }
}
