//! Academic year domain model.
//!
//! At most one year per tenant may be [`AcademicYearStatus::Active`].
//! Transition order between statuses is not enforced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SchoolError, SchoolResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AcademicYearStatus {
    Planned,
    Active,
    Archived,
}

impl AcademicYearStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicYearStatus::Planned => "Planned",
            AcademicYearStatus::Active => "Active",
            AcademicYearStatus::Archived => "Archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Planned" => Some(AcademicYearStatus::Planned),
            "Active" => Some(AcademicYearStatus::Active),
            // Older records used CLOSED for what is now ARCHIVED.
            "Archived" | "Closed" => Some(AcademicYearStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Display name such as `2025-2026`; not unique.
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: AcademicYearStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAcademicYear {
    pub tenant_id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Defaults to `Planned` when omitted.
    pub status: Option<AcademicYearStatus>,
}

/// Patch for an academic year. Omitted fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateAcademicYear {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<AcademicYearStatus>,
}

/// One row of the cross-tenant distinct-name report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcademicYearName {
    pub name: String,
}

/// Reject ranges where `end` is not strictly after `start`.
pub fn validate_date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> SchoolResult<()> {
    if end <= start {
        return Err(SchoolError::InvalidDateRange { start, end });
    }
    Ok(())
}
