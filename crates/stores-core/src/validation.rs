//! # Validation Module
//!
//! Input validation and numeric coercion for the stores ledger.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web form                                                     │
//! │  └── Required fields, immediate feedback                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Coerce form numbers (RawNumber → i64)                             │
//! │  ├── Length limits                                                     │
//! │  └── Business rules (quantity > 0, stock >= 0)                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Inventory Store                                              │
//! │  └── SKU uniqueness against the cached catalog                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Coercion Rules
//! | Input            | Quantity (must be > 0) | Stock / reorder level (default 0) |
//! |------------------|------------------------|-----------------------------------|
//! | missing          | n/a                    | 0                                 |
//! | `5`, `"5"`, `5.0`| 5                      | 5                                 |
//! | `"abc"`, `""`    | error                  | 0                                 |
//! | `2.5`            | error                  | error                             |
//! | `0`              | error                  | 0                                 |
//! | `-3`             | error                  | error                             |

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::types::{ItemChanges, ItemDraft, ItemPatch, NewItem, RawNumber};
use crate::{MAX_NAME_LEN, MAX_SKU_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Coercion
// =============================================================================

enum Coerced {
    Whole(i64),
    Fractional,
    NotNumeric,
}

fn coerce(raw: &RawNumber) -> Coerced {
    match raw {
        RawNumber::Int(n) => Coerced::Whole(*n),
        RawNumber::Float(f) => float_to_whole(*f),
        RawNumber::Text(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                Coerced::Whole(n)
            } else if let Ok(f) = s.parse::<f64>() {
                float_to_whole(f)
            } else {
                Coerced::NotNumeric
            }
        }
    }
}

fn float_to_whole(f: f64) -> Coerced {
    if !f.is_finite() {
        Coerced::NotNumeric
    } else if f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
        Coerced::Fractional
    } else {
        Coerced::Whole(f as i64)
    }
}

/// Coerces a movement quantity to a positive integer.
///
/// ## Example
/// ```rust
/// use stores_core::validation::coerce_quantity;
/// use stores_core::RawNumber;
///
/// assert_eq!(coerce_quantity(&RawNumber::from("5")).unwrap(), 5);
/// assert!(coerce_quantity(&RawNumber::from(0)).is_err());
/// assert!(coerce_quantity(&RawNumber::from("abc")).is_err());
/// ```
pub fn coerce_quantity(raw: &RawNumber) -> ValidationResult<i64> {
    match coerce(raw) {
        Coerced::Whole(n) if n > 0 => Ok(n),
        Coerced::Whole(_) => Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }),
        Coerced::Fractional | Coerced::NotNumeric => {
            if matches!(raw, RawNumber::Text(s) if s.trim().is_empty()) {
                Err(ValidationError::required("quantity"))
            } else {
                Err(ValidationError::NotAnInteger {
                    field: "quantity".to_string(),
                    value: raw.to_string(),
                })
            }
        }
    }
}

/// Coerces a count field (stock, reorder level) defaulting to 0.
///
/// Missing or non-numeric input reads as 0. Negative or fractional values
/// are rejected since the stored field is a non-negative integer.
pub fn coerce_count(field: &str, raw: Option<&RawNumber>) -> ValidationResult<i64> {
    let Some(raw) = raw else {
        return Ok(0);
    };

    match coerce(raw) {
        Coerced::Whole(n) if n < 0 => Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        }),
        Coerced::Whole(n) => Ok(n),
        Coerced::NotNumeric => Ok(0),
        Coerced::Fractional => Err(ValidationError::NotAnInteger {
            field: field.to_string(),
            value: raw.to_string(),
        }),
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field and returns it trimmed.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    validate_length(field, value, max)?;
    Ok(value.to_string())
}

/// Validates an optional free-text field and returns it trimmed.
pub fn validate_optional(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();
    validate_length(field, value, max)?;
    Ok(value.to_string())
}

fn validate_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
///
/// Any characters are accepted; existing catalogs use spaces and slashes.
pub fn validate_sku(sku: &str) -> ValidationResult<String> {
    validate_required("sku", sku, MAX_SKU_LEN)
}

// =============================================================================
// Item Validators
// =============================================================================

/// Validates a new item and stamps its creation time.
pub fn validate_new_item(input: &NewItem, now: DateTime<Utc>) -> ValidationResult<ItemDraft> {
    Ok(ItemDraft {
        name: validate_required("name", &input.name, MAX_NAME_LEN)?,
        sku: validate_sku(&input.sku)?,
        category: validate_optional("category", &input.category, MAX_NAME_LEN)?,
        unit: validate_optional("unit", &input.unit, MAX_NAME_LEN)?,
        stock: coerce_count("stock", input.stock.as_ref())?,
        reorder_level: coerce_count("reorderLevel", input.reorder_level.as_ref())?,
        created_at: now,
    })
}

/// Validates an item patch.
///
/// Fields that are present must be valid; absent fields are left alone.
/// A patch with no fields is rejected.
pub fn validate_item_patch(patch: &ItemPatch) -> ValidationResult<ItemChanges> {
    let changes = ItemChanges {
        name: patch
            .name
            .as_deref()
            .map(|v| validate_required("name", v, MAX_NAME_LEN))
            .transpose()?,
        sku: patch.sku.as_deref().map(validate_sku).transpose()?,
        category: patch
            .category
            .as_deref()
            .map(|v| validate_optional("category", v, MAX_NAME_LEN))
            .transpose()?,
        unit: patch
            .unit
            .as_deref()
            .map(|v| validate_optional("unit", v, MAX_NAME_LEN))
            .transpose()?,
        reorder_level: patch
            .reorder_level
            .as_ref()
            .map(|v| coerce_count("reorderLevel", Some(v)))
            .transpose()?,
    };

    if changes.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }
    Ok(changes)
}

/// Keeps an optional text field only when it has content.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================
