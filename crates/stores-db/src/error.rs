//! # Database Error Types
//!
//! Error types for document store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AccessError (stores-sync) ← Strategy-neutral                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InventoryError (stores-inventory) ← Banner text                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Document not found.
    ///
    /// ## When This Occurs
    /// - Patching a document that was deleted
    /// - Id doesn't exist in the collection
    #[error("{collection} document not found: {id}")]
    NotFound { collection: String, id: String },

    /// A document with this id already exists.
    ///
    /// ## When This Occurs
    /// - Creating with a client-chosen id that is taken
    #[error("Duplicate {collection} document: '{id}' already exists")]
    Duplicate { collection: String, id: String },

    /// Stored data could not be read back as a JSON object.
    #[error("Corrupt {collection} document {id}: {reason}")]
    CorruptDocument {
        collection: String,
        id: String,
        reason: String,
    },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Document body could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(collection: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Duplicate {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// True for failures of the database itself rather than of the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_) | DbError::PoolExhausted | DbError::Internal(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → QueryFailed (UNIQUE handled by callers)
/// sqlx::Error::PoolTimedOut   → PoolExhausted
/// sqlx::Error::PoolClosed     → ConnectionFailed
/// Other                       → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
