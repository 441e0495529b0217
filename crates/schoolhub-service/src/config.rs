//! Service configuration.

use serde::Deserialize;

/// Configuration shared by the orchestration services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Optional pepper prepended to passwords before Argon2id hashing
    /// and verification.
    pub pepper: Option<String>,
    /// Password given to a provisioned administrator when the request
    /// omits one.
    pub default_admin_password: String,
    /// Role assigned to the first user of every tenant.
    pub school_admin_role: String,
    /// Role assigned to delegated administrators.
    pub delegated_admin_role: String,
    /// Module keys enabled when a provisioning request has no list.
    pub default_module_keys: Vec<String>,
    /// Minimum length for caller-supplied passwords.
    pub min_password_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pepper: None,
            default_admin_password: "ChangeMe@123".into(),
            school_admin_role: "SCHOOL_ADMIN".into(),
            delegated_admin_role: "DELEGATED_ADMIN".into(),
            default_module_keys: ["ATTENDANCE", "EXAMS", "FEES", "TIMETABLE"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_password_length: 8,
        }
    }
}
