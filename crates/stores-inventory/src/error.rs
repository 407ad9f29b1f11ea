//! # Inventory Error Types
//!
//! What a caller of the Inventory Store or Ledger Engine can see go wrong.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rejected before any write            Write attempted                  │
//! │  ─────────────────────────            ───────────────                  │
//! │  Validation       form message        Transport     generic message,   │
//! │  NotFound         "Item not found"                  manual retry only  │
//! │  InsufficientStock exact numbers      PartialWrite  generic message,   │
//! │                                                     logged in detail   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is retried automatically: a retry after a transport failure
//! of unknown outcome could apply a stock delta twice.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use stores_core::{CoreError, TransactionType, ValidationError};
use stores_sync::AccessError;

/// Result type alias for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// User-facing text for any transport failure.
pub const TRANSPORT_MESSAGE: &str = "Could not reach the inventory service. Please try again.";

/// User-facing text for a half-applied stock movement.
pub const PARTIAL_WRITE_MESSAGE: &str = "An error occurred while processing this transaction";

// =============================================================================
// Partial Write
// =============================================================================

/// A stock movement whose item update landed but whose ledger entry did not.
///
/// Carries everything needed to reconcile by hand.
#[derive(Debug)]
pub struct PartialWrite {
    pub item_id: String,
    pub transaction_id: String,
    pub kind: TransactionType,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// Writes that landed, out of `total`.
    pub applied: usize,
    pub total: usize,
    pub source: AccessError,
}

impl fmt::Display for PartialWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "item {} stock moved {} -> {} ({} {}), transaction {} not recorded ({}/{} writes): {}",
            self.item_id,
            self.previous_stock,
            self.new_stock,
            self.kind,
            self.quantity,
            self.transaction_id,
            self.applied,
            self.total,
            self.source
        )
    }
}

// =============================================================================
// Inventory Error
// =============================================================================

#[derive(Debug, Error)]
pub enum InventoryError {
    /// Malformed input.
    ///
    /// ## When This Occurs
    /// - Quantity is not a positive whole number
    /// - A required field is blank
    /// - SKU already used by another item
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The referenced record is not in the current snapshot.
    #[error("{} not found", record_label(.collection))]
    NotFound { collection: String, id: String },

    /// An issue larger than the stock on hand.
    #[error("Cannot issue {requested}. Only {available} available.")]
    InsufficientStock { requested: i64, available: i64 },

    /// The persistence call failed (network, expired token, quota).
    #[error("Transport error: {0}")]
    Transport(AccessError),

    /// Two-step write stopped between the item update and the ledger entry.
    #[error("Partial write: {0}")]
    PartialWrite(Box<PartialWrite>),
}

fn record_label(collection: &str) -> &'static str {
    match collection {
        "items" => "Item",
        "letters" => "Letter",
        "categories" => "Category",
        "transactions" => "Transaction",
        _ => "Record",
    }
}

impl InventoryError {
    pub fn item_not_found(id: impl Into<String>) -> Self {
        InventoryError::NotFound {
            collection: "items".to_string(),
            id: id.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            InventoryError::Validation(_) => ErrorCode::ValidationError,
            InventoryError::NotFound { .. } => ErrorCode::NotFound,
            InventoryError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            InventoryError::Transport(_) => ErrorCode::TransportError,
            InventoryError::PartialWrite(_) => ErrorCode::PartialWrite,
        }
    }

    /// Message for the inline error banner.
    ///
    /// Business errors show their own text. Transport and partial failures
    /// show a generic message; the detail goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            InventoryError::Transport(_) => TRANSPORT_MESSAGE.to_string(),
            InventoryError::PartialWrite(_) => PARTIAL_WRITE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// The underlying access failure, if the error came from a write.
    pub fn access_error(&self) -> Option<&AccessError> {
        match self {
            InventoryError::Transport(e) => Some(e),
            InventoryError::PartialWrite(p) => Some(&p.source),
            _ => None,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.user_message(),
        }
    }
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    InsufficientStock,
    TransportError,
    PartialWrite,
}

/// What a UI layer receives when an action fails.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Cannot issue 5. Only 3 available." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

// =============================================================================
// Conversions
// =============================================================================

impl From<CoreError> for InventoryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound { item_id } => InventoryError::item_not_found(item_id),
            CoreError::InsufficientStock {
                requested,
                available,
            } => InventoryError::InsufficientStock {
                requested,
                available,
            },
            CoreError::StockOverflow { .. } => {
                InventoryError::Validation(ValidationError::InvalidFormat {
                    field: "quantity".to_string(),
                    reason: "stock would overflow".to_string(),
                })
            }
            CoreError::Validation(e) => InventoryError::Validation(e),
        }
    }
}

impl From<AccessError> for InventoryError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound { collection, id } => InventoryError::NotFound { collection, id },
            AccessError::AlreadyExists { id, .. } => {
                InventoryError::Validation(ValidationError::Duplicate {
                    field: "id".to_string(),
                    value: id,
                })
            }
            other => InventoryError::Transport(other),
        }
    }
}
