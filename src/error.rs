use thiserror::Error;

/// Storage failures shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("repository lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("concurrent write detected for {id} (expected version {expected}, got {actual})")]
    ConcurrentWrite {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("unique constraint '{constraint}' violated")]
    UniqueViolation { constraint: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl PersistenceError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, PersistenceError::ConcurrentWrite { .. })
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, PersistenceError::UniqueViolation { .. })
    }

    /// True if this is a violation of the named unique constraint.
    pub fn violates(&self, name: &str) -> bool {
        matches!(self, PersistenceError::UniqueViolation { constraint } if constraint == name)
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return PersistenceError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        PersistenceError::Database(err.to_string())
    }
}
