//! # Access Error Types
//!
//! Errors raised by either data access strategy.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Access Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Request             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  NotFound               │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  AlreadyExists          │ │
//! │  │  ConfigLoad     │  │  Http (5xx,401) │  │  Decode                 │ │
//! │  └─────────────────┘  │  Storage        │  │  Unsupported            │ │
//! │                       │  Subscription   │  └─────────────────────────┘ │
//! │                       └─────────────────┘                              │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  PartialBatch { applied, total, source }                         │  │
//! │  │  Sequential REST batch stopped midway. Earlier writes stand.     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport failures on the real-time path count toward failover.

use thiserror::Error;

use stores_db::DbError;

/// Result type alias for data access operations.
pub type AccessResult<T> = Result<T, AccessError>;

#[derive(Debug, Error)]
pub enum AccessError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the backend at all.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request did not complete in time.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Embedded store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The change feed behind a subscription went away.
    #[error("Subscription closed")]
    SubscriptionClosed,

    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("{collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    /// Response or stored document had an unexpected shape.
    #[error("Malformed document: {0}")]
    Decode(String),

    /// Operation not offered by this strategy.
    #[error("Not supported by the {strategy} strategy: {operation}")]
    Unsupported {
        strategy: &'static str,
        operation: &'static str,
    },

    // =========================================================================
    // Batch Errors
    // =========================================================================
    /// A non-atomic batch stopped after `applied` of `total` writes.
    #[error("Batch stopped after {applied} of {total} writes: {source}")]
    PartialBatch {
        applied: usize,
        total: usize,
        #[source]
        source: Box<AccessError>,
    },
}

impl AccessError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        AccessError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// True for failures of the transport rather than of the request.
    ///
    /// ## Classification
    /// ```text
    /// ConnectionFailed, Timeout, Storage, SubscriptionClosed  → transport
    /// Http 401 / 403 (token expiry), 429 (quota), 5xx        → transport
    /// Http other 4xx, NotFound, Decode, config               → not transport
    /// PartialBatch                                           → its source
    /// ```
    pub fn is_transport(&self) -> bool {
        match self {
            AccessError::ConnectionFailed(_)
            | AccessError::Timeout(_)
            | AccessError::Storage(_)
            | AccessError::SubscriptionClosed => true,
            AccessError::Http { status, .. } => {
                matches!(status, 401 | 403 | 408 | 429) || *status >= 500
            }
            AccessError::PartialBatch { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            AccessError::InvalidConfig(_)
                | AccessError::InvalidUrl(_)
                | AccessError::ConfigLoadFailed(_)
                | AccessError::ConfigSaveFailed(_)
        )
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<DbError> for AccessError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { collection, id } => AccessError::NotFound { collection, id },
            DbError::Duplicate { collection, id } => AccessError::AlreadyExists { collection, id },
            DbError::CorruptDocument { .. } | DbError::Serialization(_) => {
                AccessError::Decode(err.to_string())
            }
            other => AccessError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AccessError {
    fn from(err: serde_json::Error) -> Self {
        AccessError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for AccessError {
    fn from(err: url::ParseError) -> Self {
        AccessError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for AccessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AccessError::Timeout(0)
        } else if let Some(status) = err.status() {
            AccessError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            AccessError::Decode(err.to_string())
        } else {
            AccessError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for AccessError {
    fn from(err: std::io::Error) -> Self {
        AccessError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for AccessError {
    fn from(err: toml::de::Error) -> Self {
        AccessError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for AccessError {
    fn from(err: toml::ser::Error) -> Self {
        AccessError::ConfigSaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(AccessError::ConnectionFailed("reset".into()).is_transport());
        assert!(AccessError::Timeout(5000).is_transport());
        assert!(AccessError::Http {
            status: 401,
            message: "token expired".into()
        }
        .is_transport());
        assert!(AccessError::Http {
            status: 503,
            message: "unavailable".into()
        }
        .is_transport());

        assert!(!AccessError::Http {
            status: 400,
            message: "bad field".into()
        }
        .is_transport());
        assert!(!AccessError::not_found("items", "I1").is_transport());
        assert!(!AccessError::InvalidConfig("x".into()).is_transport());
    }

    #[test]
    fn test_partial_batch_delegates_to_source() {
        let err = AccessError::PartialBatch {
            applied: 1,
            total: 2,
            source: Box::new(AccessError::ConnectionFailed("dropped".into())),
        };
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "Batch stopped after 1 of 2 writes: Connection failed: dropped"
        );
    }

    #[test]
    fn test_db_error_mapping() {
        let err: AccessError = DbError::not_found("items", "I9").into();
        assert!(matches!(err, AccessError::NotFound { .. }));

        let err: AccessError = DbError::PoolExhausted.into();
        assert!(err.is_transport());
    }
}
