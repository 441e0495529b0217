//! Service-level error types.

use schoolhub_core::error::SchoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<ServiceError> for SchoolError {
    fn from(err: ServiceError) -> Self {
        match err {
            // Callers must not learn which half of the credential was wrong.
            ServiceError::InvalidCredentials | ServiceError::AccountInactive => {
                SchoolError::AuthenticationFailed {
                    reason: ServiceError::InvalidCredentials.to_string(),
                }
            }
            ServiceError::WeakPassword { .. } => SchoolError::validation(err.to_string()),
            ServiceError::Crypto(msg) => SchoolError::Crypto(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_and_wrong_password_look_the_same() {
        let a: SchoolError = ServiceError::InvalidCredentials.into();
        let b: SchoolError = ServiceError::AccountInactive.into();
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn weak_password_is_a_validation_error() {
        let err: SchoolError = ServiceError::WeakPassword { min: 8 }.into();
        assert!(err.is_validation());
    }
}
