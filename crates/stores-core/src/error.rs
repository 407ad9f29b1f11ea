//! # Error Types
//!
//! Domain-specific error types for stores-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stores-core errors (this file)                                        │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stores-db errors                                                      │
//! │  └── DbError          - Embedded store failures                        │
//! │                                                                         │
//! │  stores-sync errors                                                    │
//! │  └── AccessError      - Transport / strategy failures                  │
//! │                                                                         │
//! │  stores-inventory errors                                               │
//! │  └── InventoryError   - What the UI banner sees                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → InventoryError → banner           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// Raised before any write is attempted, so a `CoreError` always means
/// nothing was persisted.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced item is not in the current snapshot.
    ///
    /// ## When This Occurs
    /// - Item was deleted by another session
    /// - Caller passed a stale or mistyped id
    #[error("Item not found")]
    ItemNotFound { item_id: String },

    /// An issue would drive stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Issue (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { requested: 5, available: 3 }
    ///      │
    ///      ▼
    /// UI shows: "Cannot issue 5. Only 3 available."
    /// ```
    #[error("Cannot issue {requested}. Only {available} available.")]
    InsufficientStock { requested: i64, available: i64 },

    /// Applying the movement would overflow the stock counter.
    #[error("Stock for item {item_id} would overflow")]
    StockOverflow { item_id: String },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These map to form-level messages and are never written to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value could not be read as a whole number.
    #[error("{field} must be a whole number, got '{value}'")]
    NotAnInteger { field: String, value: String },

    /// Invalid format (e.g., unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// An update carried no changes.
    #[error("Nothing to update")]
    EmptyUpdate,
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
