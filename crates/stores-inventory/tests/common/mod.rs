//! Shared fixtures for the inventory store integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use stores_core::{Actor, Item};
use stores_db::JsonMap;
use stores_inventory::{
    InventoryEventEmitter, InventoryStore, InventoryStoreBuilder, NoOpActivitySink, SessionActor,
};
use stores_sync::{
    AccessError, AccessResult, AccessState, Collection, DataAccess, Document, FailoverReason,
    MemoryRestTransport, RealtimeAccess, RestStrategy, Snapshot, StrategyKind, Subscription, WriteOp,
};

// =============================================================================
// Fixtures
// =============================================================================

pub fn item(id: &str, sku: &str, stock: i64, reorder_level: i64) -> Item {
    Item {
        id: id.into(),
        name: format!("Item {}", id),
        sku: sku.into(),
        category: "Office Supplies".into(),
        unit: "Pcs".into(),
        stock,
        reorder_level,
        created_at: None,
    }
}

/// Stored body of an item, without its id.
pub fn item_fields(item: &Item) -> JsonMap {
    Document::from_record(item).unwrap().fields
}

/// A REST backend pre-loaded with `items`.
pub fn rest_backend(items: &[Item]) -> Arc<MemoryRestTransport> {
    let transport = Arc::new(MemoryRestTransport::new());
    for item in items {
        transport.seed(Collection::Items, &item.id, item_fields(item));
    }
    transport
}

pub fn rest_access(transport: &Arc<MemoryRestTransport>) -> Arc<dyn DataAccess> {
    Arc::new(RestStrategy::new(transport.clone()))
}

pub fn officer() -> Arc<SessionActor> {
    Arc::new(SessionActor::new(Actor::authenticated("u1", "Stores Officer")))
}

/// Builder over the REST fixture with audit logging off.
pub fn builder(transport: &Arc<MemoryRestTransport>) -> InventoryStoreBuilder {
    InventoryStore::builder(rest_access(transport))
        .with_actor(officer())
        .with_activity_sink(Arc::new(NoOpActivitySink))
}

/// Polls `check` until it holds, sleeping in small steps.
pub async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Waits until the store's cached copy of `item_id` carries `stock`.
pub async fn wait_for_stock(store: &InventoryStore, item_id: &str, stock: i64) {
    for _ in 0..500 {
        if store.item(item_id).await.map(|i| i.stock) == Some(stock) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never reached stock {}", item_id, stock);
}

/// Waits until the store caches `count` documents of `collection`.
pub async fn wait_for_count(store: &InventoryStore, collection: Collection, count: usize) {
    for _ in 0..500 {
        let cached = match collection {
            Collection::Items => store.items().await.len(),
            Collection::Categories => store.categories().await.len(),
            _ => store.transactions().await.len(),
        };
        if cached == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never reached {} cached documents", collection, count);
}

// =============================================================================
// Event recorder
// =============================================================================

#[derive(Default)]
pub struct RecordingEmitter {
    states: Mutex<Vec<(AccessState, Option<FailoverReason>)>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingEmitter {
    pub fn states(&self) -> Vec<(AccessState, Option<FailoverReason>)> {
        self.states.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl InventoryEventEmitter for RecordingEmitter {
    fn emit_snapshot(&self, _collection: Collection, _count: usize) {}

    fn emit_access_state(&self, state: AccessState, reason: Option<&FailoverReason>) {
        self.states.lock().unwrap().push((state, reason.cloned()));
    }

    fn emit_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

// =============================================================================
// Scripted real-time double
// =============================================================================

/// What a [`ScriptedRealtime`] subscription does first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstSnapshot {
    /// Never delivers; the feed stays open.
    Stall,
    /// Delivers an empty collection.
    Empty,
    /// Delivers an error.
    Fail,
}

/// A real-time strategy whose feeds are driven by the test.
///
/// Writes through it fail with a connection error.
pub struct ScriptedRealtime {
    first: FirstSnapshot,
    feeds: Mutex<Vec<(Collection, mpsc::Sender<AccessResult<Snapshot>>)>>,
}

impl ScriptedRealtime {
    pub fn new(first: FirstSnapshot) -> Arc<Self> {
        Arc::new(ScriptedRealtime {
            first,
            feeds: Mutex::new(Vec::new()),
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.feeds.lock().unwrap().len()
    }

    /// Pushes an error into the open feed for `collection`.
    pub fn break_feed(&self, collection: Collection) {
        let feeds = self.feeds.lock().unwrap();
        if let Some((_, tx)) = feeds.iter().find(|(c, _)| *c == collection) {
            let _ = tx.try_send(Err(AccessError::ConnectionFailed("socket reset".into())));
        }
    }

    fn down() -> AccessError {
        AccessError::ConnectionFailed("real-time transport blocked".into())
    }
}

#[async_trait]
impl DataAccess for ScriptedRealtime {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RealTime
    }

    async fn list(&self, _collection: Collection) -> AccessResult<Vec<Document>> {
        Err(Self::down())
    }

    async fn get(&self, _collection: Collection, _id: &str) -> AccessResult<Option<Document>> {
        Err(Self::down())
    }

    async fn create(&self, _collection: Collection, _fields: JsonMap) -> AccessResult<Document> {
        Err(Self::down())
    }

    async fn update(&self, _collection: Collection, _id: &str, _fields: JsonMap) -> AccessResult<()> {
        Err(Self::down())
    }

    async fn remove(&self, _collection: Collection, _id: &str) -> AccessResult<()> {
        Err(Self::down())
    }

    async fn batch(&self, _writes: Vec<WriteOp>) -> AccessResult<()> {
        Err(Self::down())
    }

    fn atomic_batches(&self) -> bool {
        true
    }
}

#[async_trait]
impl RealtimeAccess for ScriptedRealtime {
    async fn subscribe(&self, collection: Collection) -> AccessResult<Subscription> {
        let (tx, subscription) = Subscription::channel(collection, 4);
        match self.first {
            FirstSnapshot::Stall => {}
            FirstSnapshot::Empty => {
                let _ = tx.try_send(Ok(Snapshot::default()));
            }
            FirstSnapshot::Fail => {
                let _ = tx.try_send(Err(Self::down()));
            }
        }
        self.feeds.lock().unwrap().push((collection, tx));
        Ok(subscription)
    }
}
