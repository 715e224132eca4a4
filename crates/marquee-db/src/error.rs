//! # Database Error Types
//!
//! Error types for database operations, plus the failure classifier that
//! drives the reservation transaction's retry policy.
//!
//! ## Error Flow
//! ```text
//! SQLite error (sqlx::Error)
//!      │
//!      ▼
//! DbError (this module)  ← adds context and categorization
//!      │
//!      ▼
//! FailureClass            ← Conflict | Transient | Fatal, decided once
//!      │                    per transaction attempt
//!      ▼
//! EngineError (engine.rs) ← what callers of the engine see
//! ```

use thiserror::Error;

/// Database operation errors.
///
/// These wrap sqlx errors and provide additional context. Raw sqlx errors
/// never leave this crate.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. quantity < 1 smuggled past the
    /// boundary — a logic bug, never retried).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// The database is busy: another writer holds the lock, or our read
    /// snapshot went stale before the write lock was acquired. This is the
    /// SQLite rendering of a serialization conflict and is retryable.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// sqlx Conversion
// =============================================================================

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound          → DbError::NotFound
/// sqlx::Error::Database("locked")   → DbError::Busy
/// sqlx::Error::Database(constraint) → UniqueViolation / ForeignKey / Check
/// sqlx::Error::PoolTimedOut         → DbError::PoolExhausted
/// Other                             → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();

                // SQLITE_BUSY ("database is locked") covers both writers
                // queued behind the write lock and snapshot upgrades that
                // lost a race (SQLITE_BUSY_SNAPSHOT). Either way the
                // transaction attempt is dead and retryable.
                if msg.contains("database is locked")
                    || msg.contains("database table is locked")
                    || msg.contains("database is busy")
                {
                    DbError::Busy(msg)
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation { message: msg }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation { message: msg }
                } else {
                    DbError::QueryFailed(msg)
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Failure Classification
// =============================================================================

/// What a failed database operation means for the retry loop.
///
/// Every attempt outcome is classified exactly once, immediately after the
/// attempt. The third kind — a genuine availability `Conflict` — is raised
/// by the engine's own re-check, not by the database, so it lives on the
/// engine's attempt type rather than here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Lost a race on the same inventory, or an infrastructure hiccup.
    /// Retryable: the re-check against fresh state decides whether it
    /// becomes a real conflict.
    Transient,
    /// A logic or schema error; retrying cannot help and risks amplifying
    /// load.
    Fatal,
}

/// Classifies a database error for the retry loop.
///
/// Unknown errors classify as `Transient` — retried within the normal
/// ceiling, never indefinitely — and are logged for investigation by the
/// caller.
pub fn classify(err: &DbError) -> FailureClass {
    match err {
        // Serialization conflicts and infrastructure hiccups: retry.
        DbError::Busy(_) | DbError::PoolExhausted | DbError::ConnectionFailed(_) => {
            FailureClass::Transient
        }

        // Constraint and schema violations are logic bugs by the time they
        // reach SQLite; retrying replays the bug.
        DbError::UniqueViolation { .. }
        | DbError::ForeignKeyViolation { .. }
        | DbError::CheckViolation { .. }
        | DbError::NotFound { .. }
        | DbError::MigrationFailed(_)
        | DbError::QueryFailed(_) => FailureClass::Fatal,

        // Conservative default for anything unrecognized.
        DbError::Internal(_) => FailureClass::Transient,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
