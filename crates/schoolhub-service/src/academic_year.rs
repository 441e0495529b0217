//! Academic year management.

use std::collections::BTreeMap;

use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::academic_year::{
    AcademicYear, AcademicYearName, AcademicYearStatus, CreateAcademicYear, UpdateAcademicYear,
    validate_date_range,
};
use schoolhub_core::repository::AcademicYearRepository;
use tracing::info;
use uuid::Uuid;

/// Validates year requests and delegates the single-active-year check
/// to the repository, which runs it inside the write transaction.
pub struct AcademicYearService<Y: AcademicYearRepository> {
    year_repo: Y,
}

impl<Y: AcademicYearRepository> AcademicYearService<Y> {
    pub fn new(year_repo: Y) -> Self {
        Self { year_repo }
    }

    pub async fn create(&self, input: CreateAcademicYear) -> SchoolResult<AcademicYear> {
        if input.name.trim().is_empty() {
            return Err(SchoolError::validation("academic year name must not be empty"));
        }
        validate_date_range(input.start_date, input.end_date)?;

        let year = self.year_repo.create(input).await?;
        if year.status == AcademicYearStatus::Active {
            info!(tenant_id = %year.tenant_id, year_id = %year.id, "Academic year activated");
        }
        Ok(year)
    }

    /// Apply a patch. The effective range (patched or stored values) is
    /// checked here for a fast answer and again inside the repository's
    /// write transaction.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: UpdateAcademicYear,
    ) -> SchoolResult<AcademicYear> {
        let current = self.year_repo.get_by_id(tenant_id, id).await?;

        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(SchoolError::validation("academic year name must not be empty"));
            }
        }
        validate_date_range(
            patch.start_date.unwrap_or(current.start_date),
            patch.end_date.unwrap_or(current.end_date),
        )?;

        let activating = patch.status == Some(AcademicYearStatus::Active)
            && current.status != AcademicYearStatus::Active;

        let year = self.year_repo.update(tenant_id, id, patch).await?;
        if activating {
            info!(tenant_id = %tenant_id, year_id = %id, "Academic year activated");
        }
        Ok(year)
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> SchoolResult<AcademicYear> {
        self.year_repo.get_by_id(tenant_id, id).await
    }

    pub async fn list(&self, tenant_id: Uuid) -> SchoolResult<Vec<AcademicYear>> {
        self.year_repo.list_by_tenant(tenant_id).await
    }

    pub async fn get_active(&self, tenant_id: Uuid) -> SchoolResult<Option<AcademicYear>> {
        self.year_repo.get_active(tenant_id).await
    }

    /// Years of a tenant bucketed by status. Every status has an entry,
    /// possibly empty.
    pub async fn group_by_status(
        &self,
        tenant_id: Uuid,
    ) -> SchoolResult<BTreeMap<AcademicYearStatus, Vec<AcademicYear>>> {
        let mut groups: BTreeMap<AcademicYearStatus, Vec<AcademicYear>> = [
            AcademicYearStatus::Planned,
            AcademicYearStatus::Active,
            AcademicYearStatus::Archived,
        ]
        .into_iter()
        .map(|status| (status, Vec::new()))
        .collect();

        for year in self.year_repo.list_by_tenant(tenant_id).await? {
            groups.entry(year.status).or_default().push(year);
        }
        Ok(groups)
    }

    /// Cross-tenant report of year names, most recent first. Callers
    /// apply their own tenant filtering where needed.
    pub async fn list_distinct_names(&self) -> SchoolResult<Vec<AcademicYearName>> {
        self.year_repo.list_distinct_names().await
    }
}
