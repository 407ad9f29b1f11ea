//! # Ledger Math
//!
//! Pure planning for stock movements. The I/O half (writing the item update
//! and the transaction record together) lives in `stores-inventory`.
//!
//! ## Movement Flow
//! ```text
//! TransactionInput + cached Item
//!        │
//!        ▼
//! ┌───────────────────┐   missing        ┌──────────────────┐
//! │ 1. item exists?   │ ───────────────► │ ItemNotFound     │
//! └────────┬──────────┘                  └──────────────────┘
//!          ▼
//! ┌───────────────────┐   <= 0 / text    ┌──────────────────┐
//! │ 2. quantity > 0   │ ───────────────► │ Validation       │
//! └────────┬──────────┘                  └──────────────────┘
//!          ▼
//! ┌───────────────────┐   qty > stock    ┌──────────────────┐
//! │ 3. OUT covered?   │ ───────────────► │ InsufficientStock│
//! └────────┬──────────┘                  └──────────────────┘
//!          ▼
//!   MovementPlan { new_stock, draft }
//! ```
//!
//! Nothing here touches storage, so a rejected plan means no write happened.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{Actor, Item, Transaction, TransactionDraft, TransactionInput, TransactionType};
use crate::validation::{coerce_quantity, non_blank};

/// A validated movement, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementPlan {
    pub item_id: String,
    pub kind: TransactionType,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// The ledger entry to append alongside the stock update.
    pub draft: TransactionDraft,
}

/// Validates a movement against the item's current stock.
///
/// `item` is the cached item matching `input.item_id`, if any. The draft is
/// stamped with `at` and the actor's display name (or "Unknown").
///
/// Supplier is only kept on receipts and department only on issues.
pub fn plan_movement(
    item: Option<&Item>,
    input: &TransactionInput,
    actor: &Actor,
    at: DateTime<Utc>,
) -> CoreResult<MovementPlan> {
    let item = item.ok_or_else(|| CoreError::ItemNotFound {
        item_id: input.item_id.clone(),
    })?;

    let quantity = coerce_quantity(&input.quantity)?;

    let new_stock = match input.kind {
        TransactionType::In => item.stock.checked_add(quantity),
        TransactionType::Out => {
            if quantity > item.stock {
                return Err(CoreError::InsufficientStock {
                    requested: quantity,
                    available: item.stock,
                });
            }
            item.stock.checked_sub(quantity)
        }
    }
    .ok_or_else(|| CoreError::StockOverflow {
        item_id: item.id.clone(),
    })?;

    let (supplier, department) = match input.kind {
        TransactionType::In => (non_blank(input.supplier.as_deref()), None),
        TransactionType::Out => (None, non_blank(input.department.as_deref())),
    };

    Ok(MovementPlan {
        item_id: item.id.clone(),
        kind: input.kind,
        quantity,
        previous_stock: item.stock,
        new_stock,
        draft: TransactionDraft {
            item_id: item.id.clone(),
            kind: input.kind,
            quantity,
            date: at,
            user: actor.display_name_or_unknown(),
            reference: input.reference.trim().to_string(),
            supplier,
            department,
            notes: non_blank(input.notes.as_deref()),
        },
    })
}

/// Balance derived from the ledger: `initial + Σ IN − Σ OUT` for one item.
pub fn ledger_balance<'a, I>(item_id: &str, initial_stock: i64, transactions: I) -> i64
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .filter(|tx| tx.item_id == item_id)
        .fold(initial_stock, |acc, tx| acc.saturating_add(tx.delta()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawNumber;
    use crate::ValidationError;

    fn item(id: &str, stock: i64) -> Item {
        Item {
            id: id.into(),
            name: format!("Item {}", id),
            sku: format!("SKU-{}", id),
            category: "General".into(),
            unit: "Pcs".into(),
            stock,
            reorder_level: 5,
            created_at: None,
        }
    }

    fn actor() -> Actor {
        Actor::authenticated("u1", "Store Keeper")
    }

    #[test]
    fn test_receive_adds_stock() {
        let i1 = item("I1", 10);
        let input = TransactionInput::receive("I1", 5).with_supplier("Acme");

        let plan = plan_movement(Some(&i1), &input, &actor(), Utc::now()).unwrap();

        assert_eq!(plan.new_stock, 15);
        assert_eq!(plan.previous_stock, 10);
        assert_eq!(plan.draft.kind, TransactionType::In);
        assert_eq!(plan.draft.quantity, 5);
        assert_eq!(plan.draft.supplier.as_deref(), Some("Acme"));
        assert_eq!(plan.draft.user, "Store Keeper");
    }

    #[test]
    fn test_issue_over_limit_rejected() {
        let i2 = item("I2", 3);
        let input = TransactionInput::issue("I2", 5).with_department("IT");

        let err = plan_movement(Some(&i2), &input, &actor(), Utc::now()).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                requested: 5,
                available: 3
            }
        ));
        assert!(err.to_string().contains("Cannot issue 5. Only 3 available."));
    }

    #[test]
    fn test_issue_exact_drains_to_zero() {
        let mut i3 = item("I3", 5);
        let plan = plan_movement(
            Some(&i3),
            &TransactionInput::issue("I3", 5),
            &actor(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(plan.new_stock, 0);

        i3.stock = plan.new_stock;
        let err = plan_movement(
            Some(&i3),
            &TransactionInput::issue("I3", 1),
            &actor(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
    }

    #[test]
    fn test_missing_item() {
        let err = plan_movement(
            None,
            &TransactionInput::receive("nonexistent", 1),
            &actor(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound { ref item_id } if item_id == "nonexistent"));
    }

    #[test]
    fn test_bad_quantity_rejected() {
        let i1 = item("I1", 10);
        for raw in [RawNumber::Int(0), RawNumber::from("x"), RawNumber::Float(1.5)] {
            let input = TransactionInput::receive("I1", raw);
            let err = plan_movement(Some(&i1), &input, &actor(), Utc::now()).unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }

        let err = plan_movement(
            Some(&i1),
            &TransactionInput::receive("I1", -4),
            &actor(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_metadata_filtered_by_direction() {
        let i1 = item("I1", 10);
        let input = TransactionInput::issue("I1", 2)
            .with_supplier("Acme")
            .with_department("  ")
            .with_reference(" REQ-9 ");

        let plan = plan_movement(Some(&i1), &input, &Actor::anonymous(), Utc::now()).unwrap();

        assert_eq!(plan.draft.supplier, None);
        assert_eq!(plan.draft.department, None);
        assert_eq!(plan.draft.reference, "REQ-9");
        assert_eq!(plan.draft.user, "Unknown");
    }

    #[test]
    fn test_balance_never_negative_over_sequence() {
        let mut current = item("I1", 4);
        let initial = current.stock;
        let mut ledger = Vec::new();
        let moves = [
            TransactionInput::issue("I1", 3),
            TransactionInput::issue("I1", 3),
            TransactionInput::receive("I1", 6),
            TransactionInput::issue("I1", 7),
            TransactionInput::issue("I1", 1),
        ];

        for (n, input) in moves.iter().enumerate() {
            match plan_movement(Some(&current), input, &actor(), Utc::now()) {
                Ok(plan) => {
                    assert!(plan.new_stock >= 0);
                    current.stock = plan.new_stock;
                    ledger.push(plan.draft.into_transaction(format!("T{}", n)));
                }
                Err(CoreError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(current.stock, 0);
        assert_eq!(ledger_balance("I1", initial, &ledger), current.stock);
    }
}
