//! SchoolHub services: tenant provisioning, academic years, module
//! entitlements, permission resolution, delegated administrators and
//! credential checks, generic over the `schoolhub-core` repositories.

pub mod academic_year;
pub mod config;
pub mod credentials;
pub mod delegated_admin;
pub mod entitlement;
pub mod error;
pub mod password;
pub mod permissions;
pub mod provisioning;

pub use academic_year::AcademicYearService;
pub use config::ServiceConfig;
pub use credentials::CredentialService;
pub use delegated_admin::DelegatedAdminService;
pub use entitlement::{BulkEntitlementOutcome, EntitlementService};
pub use error::ServiceError;
pub use permissions::{PermissionService, ProfileService};
pub use provisioning::TenantProvisioningService;
