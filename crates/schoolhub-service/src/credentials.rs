//! Email + password authentication against stored identities.

use schoolhub_core::error::SchoolResult;
use schoolhub_core::models::identity::IdentityKind;
use schoolhub_core::models::user::User;
use schoolhub_core::repository::{AuthIdentityRepository, UserRepository};
use tracing::debug;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::password;

pub struct CredentialService<I: AuthIdentityRepository, U: UserRepository> {
    identity_repo: I,
    user_repo: U,
    config: ServiceConfig,
}

impl<I: AuthIdentityRepository, U: UserRepository> CredentialService<I, U> {
    pub fn new(identity_repo: I, user_repo: U, config: ServiceConfig) -> Self {
        Self {
            identity_repo,
            user_repo,
            config,
        }
    }

    /// Authenticate with the tenant-scoped email identity.
    ///
    /// Unknown email, wrong password and inactive account all fail with
    /// the same `AuthenticationFailed` reason.
    pub async fn authenticate(
        &self,
        tenant_id: Uuid,
        email: &str,
        password: &str,
    ) -> SchoolResult<User> {
        let identity = self
            .identity_repo
            .find_by_value(tenant_id, IdentityKind::Email, email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let valid =
            password::verify_password(password, &identity.secret, self.config.pepper.as_deref())?;
        if !valid {
            debug!(tenant_id = %tenant_id, user_id = %identity.user_id, "Password mismatch");
            return Err(ServiceError::InvalidCredentials.into());
        }

        let user = self.user_repo.get_by_id(tenant_id, identity.user_id).await?;
        if !user.is_active {
            return Err(ServiceError::AccountInactive.into());
        }
        Ok(user)
    }
}
