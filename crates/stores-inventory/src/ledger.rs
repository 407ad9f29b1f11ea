//! # Ledger Engine
//!
//! The only code path that changes an item's stock.
//!
//! ## recordTransaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. plan_movement (stores-core)        rejects before any write        │
//! │       item exists? qty > 0? OUT covered?                               │
//! │                                                                         │
//! │  2. batch([                                                             │
//! │       Update items/{id}        { stock: new_stock }                    │
//! │       Set    transactions/{tx} { itemId, type, quantity, date, ... }   │
//! │     ])                                                                  │
//! │                                                                         │
//! │     atomic strategy      → both or neither                             │
//! │     sequential strategy  → item first, then ledger entry; a failure    │
//! │                            between them is reported as PartiallyApplied│
//! │                                                                         │
//! │  3. activity log  stock_in / stock_out  (queued, failures swallowed)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never retries: after an unknown-outcome failure a retry could
//! apply the delta twice.

use chrono::Utc;
use serde_json::json;
use stores_db::JsonMap;
use tracing::{error, info, instrument};
use uuid::Uuid;

use stores_core::ledger::plan_movement;
use stores_core::{Actor, Item, Transaction, TransactionInput, TransactionType};
use stores_sync::{to_fields, AccessError, Collection, DataAccess, WriteOp};

use crate::activity::{ActivityAction, ActivityEntry, ActivityLogger};
use crate::error::{InventoryError, InventoryResult, PartialWrite};

/// How far a recorded movement got.
///
/// Rejections before any write are `Err` from [`LedgerEngine::record`].
#[derive(Debug)]
pub enum LedgerOutcome {
    /// Stock updated and ledger entry written.
    Applied {
        transaction: Transaction,
        new_stock: i64,
    },
    /// Stock updated, ledger entry missing.
    PartiallyApplied(PartialWrite),
}

/// Records stock movements.
#[derive(Clone)]
pub struct LedgerEngine {
    activity: ActivityLogger,
}

impl LedgerEngine {
    pub fn new(activity: ActivityLogger) -> Self {
        LedgerEngine { activity }
    }

    /// Validates and writes one movement.
    ///
    /// `item` is the cached item for `input.item_id`, if the cache has it.
    #[instrument(skip_all, fields(item_id = %input.item_id, kind = %input.kind))]
    pub async fn record(
        &self,
        access: &dyn DataAccess,
        item: Option<&Item>,
        input: &TransactionInput,
        actor: &Actor,
    ) -> InventoryResult<LedgerOutcome> {
        let plan = plan_movement(item, input, actor, Utc::now())?;
        let transaction_id = Uuid::new_v4().to_string();

        let writes = vec![
            WriteOp::Update {
                collection: Collection::Items,
                id: plan.item_id.clone(),
                fields: stock_fields(plan.new_stock),
            },
            WriteOp::Set {
                collection: Collection::Transactions,
                id: transaction_id.clone(),
                fields: to_fields(&plan.draft)?,
            },
        ];

        match access.batch(writes).await {
            Ok(()) => {}
            Err(AccessError::PartialBatch {
                applied,
                total,
                source,
            }) => {
                let partial = PartialWrite {
                    item_id: plan.item_id,
                    transaction_id,
                    kind: plan.kind,
                    quantity: plan.quantity,
                    previous_stock: plan.previous_stock,
                    new_stock: plan.new_stock,
                    applied,
                    total,
                    source: *source,
                };
                error!(
                    item_id = %partial.item_id,
                    transaction_id = %partial.transaction_id,
                    previous_stock = partial.previous_stock,
                    new_stock = partial.new_stock,
                    quantity = partial.quantity,
                    error = %partial.source,
                    "Stock updated without a ledger entry; reconcile manually"
                );
                return Ok(LedgerOutcome::PartiallyApplied(partial));
            }
            Err(e) => return Err(InventoryError::from(e)),
        }

        let new_stock = plan.new_stock;
        let transaction = plan.draft.into_transaction(transaction_id);
        info!(
            transaction_id = %transaction.id,
            quantity = transaction.quantity,
            new_stock,
            "Stock movement recorded"
        );

        let item_name = item.map(|i| i.name.as_str()).unwrap_or(&transaction.item_id);
        let (action, verb) = match transaction.kind {
            TransactionType::In => (ActivityAction::StockIn, "Received"),
            TransactionType::Out => (ActivityAction::StockOut, "Issued"),
        };
        let details = format!(
            "{} {} of {} (stock now {})",
            verb, transaction.quantity, item_name, new_stock
        );
        self.activity
            .log(ActivityEntry::new(action, details, actor).target("item", transaction.item_id.clone()));

        Ok(LedgerOutcome::Applied {
            transaction,
            new_stock,
        })
    }
}

fn stock_fields(stock: i64) -> JsonMap {
    let mut fields = JsonMap::new();
    fields.insert("stock".to_string(), json!(stock));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stores_core::RawNumber;
    use stores_sync::{InjectedFailure, MemoryRestTransport, Method, RestStrategy};

    fn item(id: &str, stock: i64) -> Item {
        Item {
            id: id.into(),
            name: "Extension Cord 5m".into(),
            sku: "ELE-EXT-5M".into(),
            category: "Electrical".into(),
            unit: "Pcs".into(),
            stock,
            reorder_level: 5,
            created_at: None,
        }
    }

    fn seeded(stock: i64) -> (Arc<MemoryRestTransport>, RestStrategy, Item) {
        let transport = Arc::new(MemoryRestTransport::new());
        let cached = item("I1", stock);
        transport.seed(
            Collection::Items,
            "I1",
            to_fields(&cached).unwrap().into_iter().filter(|(k, _)| k != "id").collect(),
        );
        let rest = RestStrategy::new(transport.clone());
        (transport, rest, cached)
    }

    #[tokio::test]
    async fn test_receive_writes_both_documents() {
        let (transport, rest, cached) = seeded(10);
        let engine = LedgerEngine::new(ActivityLogger::disabled());

        let outcome = engine
            .record(
                &rest,
                Some(&cached),
                &TransactionInput::receive("I1", 5).with_supplier("Acme"),
                &Actor::authenticated("u1", "Stores Officer"),
            )
            .await
            .unwrap();

        let LedgerOutcome::Applied {
            transaction,
            new_stock,
        } = outcome
        else {
            panic!("expected a fully applied movement");
        };
        assert_eq!(new_stock, 15);
        assert_eq!(transaction.quantity, 5);
        assert_eq!(transaction.user, "Stores Officer");
        assert_eq!(transaction.supplier.as_deref(), Some("Acme"));

        assert_eq!(transport.document(Collection::Items, "I1").unwrap()["stock"], 15);
        let stored = transport
            .document(Collection::Transactions, &transaction.id)
            .unwrap();
        assert_eq!(stored["type"], "IN");
        assert_eq!(stored["itemId"], "I1");
    }

    #[tokio::test]
    async fn test_rejections_write_nothing() {
        let (transport, rest, cached) = seeded(3);
        let engine = LedgerEngine::new(ActivityLogger::disabled());
        let actor = Actor::anonymous();

        let err = engine
            .record(&rest, Some(&cached), &TransactionInput::issue("I1", 5).with_department("IT"), &actor)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot issue 5. Only 3 available.");

        let err = engine
            .record(&rest, Some(&cached), &TransactionInput::issue("I1", RawNumber::from("abc")), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));

        let err = engine
            .record(&rest, None, &TransactionInput::receive("nonexistent", 1), &actor)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Item not found");

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_ledger_entry_is_partial() {
        let (transport, rest, cached) = seeded(25);
        transport.fail_next(Method::Patch, "transactions/", InjectedFailure::Status(503));
        let engine = LedgerEngine::new(ActivityLogger::disabled());

        let outcome = engine
            .record(&rest, Some(&cached), &TransactionInput::issue("I1", 5), &Actor::anonymous())
            .await
            .unwrap();

        let LedgerOutcome::PartiallyApplied(partial) = outcome else {
            panic!("expected a partial write");
        };
        assert_eq!(partial.previous_stock, 25);
        assert_eq!(partial.new_stock, 20);
        assert_eq!(partial.applied, 1);
        assert_eq!(transport.document(Collection::Items, "I1").unwrap()["stock"], 20);
        assert_eq!(transport.count(Collection::Transactions), 0);
    }

    #[tokio::test]
    async fn test_failed_item_update_is_transport_error() {
        let (transport, rest, cached) = seeded(25);
        transport.fail_next(Method::Patch, "items/", InjectedFailure::Connection);
        let engine = LedgerEngine::new(ActivityLogger::disabled());

        let err = engine
            .record(&rest, Some(&cached), &TransactionInput::issue("I1", 5), &Actor::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Transport(_)));
        assert_eq!(transport.document(Collection::Items, "I1").unwrap()["stock"], 25);
    }
}
