//! Self-service profile view.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::authority::EffectiveAuthority;
use super::tenant::TenantKind;
use super::user::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantBrief {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: TenantKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: User,
    pub role_name: String,
    pub email: Option<String>,
    pub tenant: TenantBrief,
    pub authority: EffectiveAuthority,
}
