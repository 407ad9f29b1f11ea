//! Inventory store end to end over the SQLite-backed real-time strategy.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use stores_core::ledger::ledger_balance;
use stores_core::{Item, ItemPatch, Transaction, TransactionInput};
use stores_db::Database;
use stores_inventory::{ErrorCode, InventoryStore};
use stores_sync::{parse_all, AccessState, Collection, DataAccess, RealtimeStrategy};

use common::{
    builder, item, item_fields, rest_backend, wait_for_count, wait_for_stock, RecordingEmitter,
};

async fn seeded_realtime() -> Arc<RealtimeStrategy> {
    realtime_with(&[item("I1", "OFF-PAP-A4", 10, 5), item("I2", "SAF-GLV-L", 3, 5)]).await
}

async fn realtime_with(items: &[Item]) -> Arc<RealtimeStrategy> {
    let db = Database::in_memory().await.unwrap();
    for seeded in items {
        db.documents()
            .insert("items", &seeded.id, &item_fields(&seeded))
            .await
            .unwrap();
    }
    db.documents()
        .insert(
            "categories",
            "C1",
            &json!({ "name": "Office Supplies" })
                .as_object()
                .cloned()
                .unwrap(),
        )
        .await
        .unwrap();
    Arc::new(RealtimeStrategy::new(db))
}

async fn connect(realtime: &Arc<RealtimeStrategy>) -> (InventoryStore, Arc<RecordingEmitter>) {
    let transport = rest_backend(&[]);
    let emitter = Arc::new(RecordingEmitter::default());
    let store = builder(&transport)
        .with_realtime(realtime.clone())
        .probe_timeout(Duration::from_secs(5))
        .with_emitter(emitter.clone())
        .connect()
        .await
        .unwrap();
    (store, emitter)
}

#[tokio::test]
async fn test_connect_loads_first_snapshots() {
    let realtime = seeded_realtime().await;
    let (store, emitter) = connect(&realtime).await;

    assert_eq!(store.access_state(), AccessState::RealTime);
    assert_eq!(emitter.states(), vec![(AccessState::RealTime, None)]);
    assert_eq!(store.items().await.len(), 2);
    assert_eq!(store.categories().await[0].name, "Office Supplies");
    assert!(store.transactions().await.is_empty());
}

#[tokio::test]
async fn test_movements_are_atomic_and_cached() {
    let realtime = seeded_realtime().await;
    let (store, _) = connect(&realtime).await;

    let tx = store
        .record_transaction(TransactionInput::receive("I1", 5).with_supplier("Acme"))
        .await
        .unwrap();
    assert_eq!(store.item("I1").await.unwrap().stock, 15);
    assert_eq!(store.transactions().await[0].id, tx.id);

    let stored = realtime
        .database()
        .documents()
        .get("items", "I1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data["stock"], 15);
    assert!(realtime
        .database()
        .documents()
        .get("transactions", &tx.id)
        .await
        .unwrap()
        .is_some());

    let err = store
        .record_transaction(TransactionInput::issue("I2", 5).with_department("IT"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientStock);
    assert_eq!(
        realtime
            .database()
            .documents()
            .count("transactions")
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_foreign_writes_arrive_by_push() {
    let realtime = seeded_realtime().await;
    let (store, _) = connect(&realtime).await;

    // Another session issues stock through the same backend.
    let other_session = InventoryStore::builder(realtime.clone())
        .with_activity_sink(Arc::new(stores_inventory::NoOpActivitySink))
        .connect()
        .await
        .unwrap();
    assert_eq!(other_session.access_state(), AccessState::Rest);
    other_session
        .record_transaction(TransactionInput::issue("I1", 4))
        .await
        .unwrap();

    wait_for_stock(&store, "I1", 6).await;
    wait_for_count(&store, Collection::Transactions, 1).await;
    assert_eq!(store.transactions().await[0].user, "Unknown");
}

#[tokio::test]
async fn test_item_edits_stay_consistent_with_pushes() {
    let realtime = seeded_realtime().await;
    let (store, _) = connect(&realtime).await;

    store
        .update_item(
            "I2",
            ItemPatch {
                name: Some("Safety Gloves (L)".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    store.delete_item("I1").await.unwrap();

    wait_for_count(&store, Collection::Items, 1).await;
    let items = store.items().await;
    assert_eq!(items[0].name, "Safety Gloves (L)");
    assert_eq!(items[0].stock, 3);

    let stored = realtime.list(Collection::Items).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].fields["name"], "Safety Gloves (L)");
    assert_eq!(stored[0].fields["stock"], 3);
}

#[tokio::test]
async fn test_shutdown_stops_pushes() {
    let realtime = seeded_realtime().await;
    let (store, _) = connect(&realtime).await;
    store.shutdown();

    realtime
        .create(Collection::Items, item_fields(&item("I9", "ELE-BLB-LED", 1, 1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(store.items().await.len(), 2);
    assert_eq!(realtime.list(Collection::Items).await.unwrap().len(), 3);
    assert_eq!(store.access_state(), AccessState::RealTime);
}

#[tokio::test]
async fn test_back_to_back_movements_match_the_ledger() {
    let realtime = realtime_with(&[
        item("I1", "OFF-PAP-A4", 1000, 5),
        item("I2", "SAF-GLV-L", 1000, 5),
    ])
    .await;
    let (store, _) = connect(&realtime).await;

    for n in 0..200 {
        let item_id = if n % 2 == 0 { "I1" } else { "I2" };
        store
            .record_transaction(TransactionInput::issue(item_id, 1))
            .await
            .unwrap();
    }

    let ledger: Vec<Transaction> = parse_all(
        Collection::Transactions,
        &realtime.list(Collection::Transactions).await.unwrap(),
    );
    assert_eq!(ledger.len(), 200);
    for item_id in ["I1", "I2"] {
        let stored = realtime.get(Collection::Items, item_id).await.unwrap().unwrap();
        assert_eq!(stored.fields["stock"], 900);
        assert_eq!(ledger_balance(item_id, 1000, &ledger), 900);
    }

    wait_for_count(&store, Collection::Transactions, 200).await;
    wait_for_stock(&store, "I1", 900).await;
    wait_for_stock(&store, "I2", 900).await;
}

#[tokio::test]
async fn test_movement_plans_from_stored_stock() {
    let realtime = seeded_realtime().await;
    let (store, _) = connect(&realtime).await;
    assert_eq!(store.item("I1").await.unwrap().stock, 10);

    // Storage changes without waking any watcher, so the cache still says 10.
    realtime
        .database()
        .documents()
        .patch("items", "I1", &json!({ "stock": 2 }).as_object().cloned().unwrap())
        .await
        .unwrap();
    assert_eq!(store.item("I1").await.unwrap().stock, 10);

    let err = store
        .record_transaction(TransactionInput::issue("I1", 5))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot issue 5. Only 2 available.");
    assert_eq!(store.item("I1").await.unwrap().stock, 2);

    store
        .record_transaction(TransactionInput::receive("I1", 3))
        .await
        .unwrap();
    let stored = realtime.get(Collection::Items, "I1").await.unwrap().unwrap();
    assert_eq!(stored.fields["stock"], 5);
}
