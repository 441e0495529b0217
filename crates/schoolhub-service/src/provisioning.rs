//! Tenant provisioning: one request in, one fully formed school out.

use chrono::{DateTime, Duration, Months, Utc};
use schoolhub_core::error::{SchoolError, SchoolResult};
use schoolhub_core::models::identity::{IdentityKind, normalize_identity_value};
use schoolhub_core::models::module::Module;
use schoolhub_core::models::provisioning::{CreateTenantRequest, ProvisionTenant, TenantSummary};
use schoolhub_core::repository::{ModuleRepository, ProvisioningRepository};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::password;

/// Start and end of the first academic year.
///
/// With an explicit start the year ends one year minus one day later;
/// without one it runs from `now` for one year.
pub fn first_year_bounds(
    explicit_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    match explicit_start {
        Some(start) => {
            let end = start
                .checked_add_months(Months::new(12))
                .unwrap_or(start + Duration::days(365))
                - Duration::days(1);
            (start, end)
        }
        None => {
            let end = now
                .checked_add_months(Months::new(12))
                .unwrap_or(now + Duration::days(365));
            (now, end)
        }
    }
}

fn require(field: &str, value: &str) -> SchoolResult<()> {
    if value.trim().is_empty() {
        return Err(SchoolError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> SchoolResult<()> {
    require("email", email)?;
    if !email.contains('@') {
        return Err(SchoolError::validation(format!("'{email}' is not an email address")));
    }
    Ok(())
}

pub(crate) fn check_password_policy(password: &str, min: usize) -> SchoolResult<()> {
    if password.chars().count() < min {
        return Err(ServiceError::WeakPassword { min }.into());
    }
    Ok(())
}

/// Requested keys with no catalog entry, each reported once.
fn missing_module_keys<'a>(requested: &'a [String], found: &[Module]) -> Vec<&'a str> {
    let mut missing: Vec<&str> = Vec::new();
    for key in requested {
        if !found.iter().any(|m| &m.key == key) && !missing.contains(&key.as_str()) {
            missing.push(key);
        }
    }
    missing
}

fn validate_request(request: &CreateTenantRequest, config: &ServiceConfig) -> SchoolResult<()> {
    require("name", &request.name)?;
    require("code", &request.code)?;
    require("subdomain", &request.subdomain)?;
    require("academic_year_name", &request.academic_year_name)?;
    require("admin_name", &request.admin_name)?;
    validate_email(&request.admin_email)?;
    if let Some(password) = &request.admin_password {
        check_password_policy(password, config.min_password_length)?;
    }
    Ok(())
}

/// Creates tenants together with their administrator, first academic
/// year and module entitlements.
///
/// Generic over repository implementations so that the service layer
/// has no dependency on the database crate.
pub struct TenantProvisioningService<P: ProvisioningRepository, M: ModuleRepository> {
    provisioning_repo: P,
    module_repo: M,
    config: ServiceConfig,
}

impl<P: ProvisioningRepository, M: ModuleRepository> TenantProvisioningService<P, M> {
    pub fn new(provisioning_repo: P, module_repo: M, config: ServiceConfig) -> Self {
        Self {
            provisioning_repo,
            module_repo,
            config,
        }
    }

    /// Provision a tenant. Nothing is written unless everything is.
    ///
    /// Fails with `Validation` before any write, `DuplicateTenant` when
    /// the code or subdomain is taken, and `ProvisioningFailed` wrapping
    /// the cause for anything else.
    pub async fn create_tenant(&self, request: CreateTenantRequest) -> SchoolResult<TenantSummary> {
        validate_request(&request, &self.config)?;

        let (input, enabled_modules) = self
            .resolve(request)
            .await
            .map_err(SchoolError::into_provisioning_failure)?;
        let code = input.code.clone();

        let mut summary = self
            .provisioning_repo
            .provision_tenant(input)
            .await
            .map_err(SchoolError::into_provisioning_failure)?;
        summary.enabled_modules = enabled_modules;

        info!(
            tenant_id = %summary.tenant_id,
            code = %code,
            admin_id = %summary.admin.user_id,
            year_id = %summary.academic_year.id,
            modules = summary.enabled_modules.len(),
            "Tenant provisioned"
        );
        Ok(summary)
    }

    /// Everything that can be computed before the transaction: the
    /// password digest, the year bounds and the catalog lookup.
    async fn resolve(
        &self,
        request: CreateTenantRequest,
    ) -> SchoolResult<(ProvisionTenant, Vec<String>)> {
        let secret = password::hash_password(
            request
                .admin_password
                .as_deref()
                .unwrap_or(&self.config.default_admin_password),
            self.config.pepper.as_deref(),
        )?;

        let requested = request
            .module_keys
            .unwrap_or_else(|| self.config.default_module_keys.clone());
        let modules = self.module_repo.get_by_keys(&requested).await?;
        let missing = missing_module_keys(&requested, &modules);
        if !missing.is_empty() {
            warn!(
                code = %request.code,
                ?missing,
                "Requested modules not in catalog; enabling the rest"
            );
        }

        let (year_start, year_end) = first_year_bounds(request.academic_year_start, Utc::now());

        let input = ProvisionTenant {
            name: request.name.trim().to_string(),
            code: request.code.trim().to_string(),
            subdomain: request.subdomain.trim().to_lowercase(),
            kind: request.kind.unwrap_or_default(),
            year_name: request.academic_year_name.trim().to_string(),
            year_start,
            year_end,
            admin_role_name: self.config.school_admin_role.clone(),
            admin_name: request.admin_name.trim().to_string(),
            admin_email: normalize_identity_value(IdentityKind::Email, &request.admin_email),
            admin_secret: secret,
            module_ids: modules.iter().map(|m| m.id).collect(),
        };
        Ok((input, modules.into_iter().map(|m| m.key).collect()))
    }
}
