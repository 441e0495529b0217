//! Authentication identities attached to users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IdentityKind {
    Email,
    Phone,
    Username,
}

impl IdentityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::Email => "Email",
            IdentityKind::Phone => "Phone",
            IdentityKind::Username => "Username",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Email" => Some(IdentityKind::Email),
            "Phone" => Some(IdentityKind::Phone),
            "Username" => Some(IdentityKind::Username),
            _ => None,
        }
    }
}

/// A login identifier plus credential digest, unique per
/// `(tenant_id, kind, value)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub kind: IdentityKind,
    pub value: String,
    /// Opaque one-way digest (Argon2id PHC string).
    #[serde(skip_serializing)]
    pub secret: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuthIdentity {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub kind: IdentityKind,
    pub value: String,
    /// Already-hashed secret.
    pub secret: String,
    pub verified: bool,
}

/// Identity values are compared case-insensitively for email.
pub fn normalize_identity_value(kind: IdentityKind, value: &str) -> String {
    match kind {
        IdentityKind::Email => value.trim().to_lowercase(),
        IdentityKind::Phone | IdentityKind::Username => value.trim().to_string(),
    }
}
