//! Database-specific error types and conversions.

use std::collections::HashMap;

use schoolhub_core::error::SchoolError;

/// Prefix on every `THROW` raised by our transaction scripts.
pub(crate) const THROW_MARKER: &str = "schoolhub:";

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Could not decode stored value: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A guard inside a transaction script raised `THROW`.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// A `UNIQUE` index refused the write.
    #[error("Unique index {index} violated")]
    UniqueViolation { index: String },

    /// The transaction lost a write-write race at commit and may be retried.
    #[error("Transaction conflict: {0}")]
    Conflict(String),
}

impl DbError {
    pub(crate) fn decode(what: &str, err: impl std::fmt::Display) -> Self {
        DbError::Decode(format!("invalid {what}: {err}"))
    }

    /// The payload after the marker when this is a thrown rejection
    /// with the given code, e.g. `conflicting_active_year`.
    pub(crate) fn rejection_detail(&self, code: &str) -> Option<&str> {
        match self {
            DbError::Rejected(payload) => {
                let rest = payload.strip_prefix(code)?;
                Some(rest.strip_prefix(':').unwrap_or(rest))
            }
            _ => None,
        }
    }

    pub(crate) fn violates(&self, index: &str) -> bool {
        matches!(self, DbError::UniqueViolation { index: i } if i == index)
    }

    /// Whether re-running the same script may succeed.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            DbError::Conflict(_) => true,
            DbError::Surreal(err) => is_conflict_message(&err.to_string()),
            _ => false,
        }
    }
}

fn is_conflict_message(msg: &str) -> bool {
    msg.contains("can be retried")
        || msg.contains("read or write conflict")
        || msg.contains("Transaction conflict")
}

/// Reduce the per-statement errors of a failed script to one error.
///
/// When a transaction aborts, SurrealDB reports the real failure on one
/// statement and a generic "not executed" error on the others, so every
/// entry is inspected. Precedence: thrown rejections, index violations,
/// commit conflicts, then anything else.
pub(crate) fn classify_errors(errors: HashMap<usize, surrealdb::Error>) -> Option<DbError> {
    let mut messages: Vec<(usize, String)> = errors
        .into_iter()
        .map(|(idx, err)| (idx, err.to_string()))
        .collect();
    if messages.is_empty() {
        return None;
    }
    messages.sort_by_key(|(idx, _)| *idx);

    for (_, msg) in &messages {
        if let Some(pos) = msg.find(THROW_MARKER) {
            let payload = msg[pos + THROW_MARKER.len()..]
                .trim_end_matches(['\'', '"', '`', '.'])
                .to_string();
            return Some(DbError::Rejected(payload));
        }
    }
    for (_, msg) in &messages {
        if msg.contains("already contains") {
            if let Some(index) = index_name(msg) {
                return Some(DbError::UniqueViolation { index });
            }
        }
    }
    for (_, msg) in &messages {
        if is_conflict_message(msg) {
            return Some(DbError::Conflict(msg.clone()));
        }
    }
    let primary = messages
        .iter()
        .find(|(_, msg)| !msg.contains("not executed"))
        .unwrap_or(&messages[0]);
    Some(DbError::Query(primary.1.clone()))
}

/// Extract `idx_...` from an index violation message.
fn index_name(msg: &str) -> Option<String> {
    let start = msg.find("idx_")?;
    let name: String = msg[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    Some(name)
}

impl From<DbError> for SchoolError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SchoolError::NotFound { entity, id },
            DbError::UniqueViolation { index } => SchoolError::AlreadyExists { entity: index },
            DbError::Rejected(payload) => SchoolError::Internal(format!("unhandled rejection: {payload}")),
            other => SchoolError::Database(other.to_string()),
        }
    }
}
