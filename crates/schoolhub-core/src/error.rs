//! Error types for the SchoolHub entitlement core.
//!
//! Every rejection reason is a distinct variant so transport layers can
//! map them to responses without inspecting message text.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SchoolError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid date range: end {end} must be after start {start}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Tenant not found: {0}")]
    TenantNotFound(Uuid),

    #[error("Module not found: {0}")]
    ModuleNotFound(Uuid),

    #[error("No entitlement for module {module_id} in tenant {tenant_id}")]
    EntitlementNotFound { tenant_id: Uuid, module_id: Uuid },

    #[error("Role not found: {name} (was the catalog seeded?)")]
    RoleNotFound { name: String },

    #[error("Tenant with code '{code}' or subdomain '{subdomain}' already exists")]
    DuplicateTenant { code: String, subdomain: String },

    #[error("Module already exists: {key}")]
    DuplicateModule { key: String },

    #[error("An identity for '{email}' already exists in this tenant")]
    DuplicateEmail { email: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Academic year '{existing_name}' ({existing_id}) is already active")]
    ConflictingActiveYear {
        existing_id: Uuid,
        existing_name: String,
    },

    #[error("Provisioning failed: {0}")]
    ProvisioningFailed(#[source] Box<SchoolError>),

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SchoolResult<T> = Result<T, SchoolError>;

impl SchoolError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wrap a failure that happened while a provisioning transaction was
    /// in flight. Conflict and validation rejections pass through so
    /// callers can still tell them apart.
    pub fn into_provisioning_failure(self) -> Self {
        if self.is_conflict() || self.is_validation() {
            return self;
        }
        match self {
            already @ Self::ProvisioningFailed(_) => already,
            other => Self::ProvisioningFailed(Box::new(other)),
        }
    }

    /// The innermost error, unwrapping `ProvisioningFailed` layers.
    pub fn root_cause(&self) -> &SchoolError {
        match self {
            Self::ProvisioningFailed(inner) => inner.root_cause(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::TenantNotFound(_)
                | Self::ModuleNotFound(_)
                | Self::EntitlementNotFound { .. }
                | Self::RoleNotFound { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTenant { .. }
                | Self::DuplicateModule { .. }
                | Self::DuplicateEmail { .. }
                | Self::AlreadyExists { .. }
                | Self::ConflictingActiveYear { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidDateRange { .. })
    }
}
