//! Password hashing and verification using Argon2id.
//!
//! Parameters follow the OWASP recommendation (memory: 19 MiB,
//! iterations: 2, parallelism: 1). Salt is generated per hash. An
//! optional pepper is prepended to the password on both paths.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};

use crate::error::ServiceError;

fn hasher() -> Result<Argon2<'static>, ServiceError> {
    let params = Params::new(19456, 2, 1, None)
        .map_err(|e| ServiceError::Crypto(format!("argon2 params error: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn peppered(password: &str, pepper: Option<&str>) -> String {
    match pepper {
        Some(p) => format!("{p}{password}"),
        None => password.to_string(),
    }
}

/// Hash a password into a PHC-format string.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(peppered(password, pepper).as_bytes(), &salt)
        .map_err(|e| ServiceError::Crypto(format!("hash error: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a PHC-format hash.
///
/// Returns `Ok(false)` on mismatch and `Err(ServiceError::Crypto)` when
/// the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, ServiceError> {
    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| ServiceError::Crypto(format!("invalid hash format: {e}")))?;

    match hasher()?.verify_password(peppered(password, pepper).as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ServiceError::Crypto(format!("verify error: {e}"))),
    }
}
