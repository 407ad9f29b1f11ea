//! # Inventory Store
//!
//! Cached, reactive view of items, categories and transactions, plus item
//! CRUD and the entry point for stock movements.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  connect()                                                              │
//! │     │                                                                   │
//! │     ├── selector says Rest ──────────────► one REST fetch of each      │
//! │     │                                      collection                   │
//! │     ▼                                                                   │
//! │  Probing: subscribe items / categories / transactions                  │
//! │     │                                                                   │
//! │     ├── all first snapshots within probe_timeout                        │
//! │     │        └─► RealTime: listener task per subscription              │
//! │     │                      push → replace cached collection            │
//! │     │                      error → fail over (once)                    │
//! │     │                                                                   │
//! │     └── timeout / error                                                 │
//! │              └─► drop subscriptions, one REST fetch of each            │
//! │                                                                         │
//! │  Rest: reads via refresh(), cache updated from each write's response   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Stock movements run one at a time per store (`ledger_lock`) and plan from
//! the item as storage holds it, read under that lock, never from the cache.
//! Two issues from this process therefore cannot both spend the same stock.
//! Movements from other sessions are not serialized against ours.
//!
//! Pushed snapshots carry the strategy's write revision. After a write the
//! store records the revision it reached, and drops any later-arriving push
//! listed before that point, so the cache never rolls back past its own
//! writes. A fresher push always follows, since the write itself woke the
//! watcher.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use stores_core::report::{self, AuditSummary, DashboardSummary, StockAlerts};
use stores_core::validation::{validate_item_patch, validate_new_item};
use stores_core::{
    normalize_sku, Category, Item, ItemPatch, NewItem, Transaction, TransactionInput,
    ValidationError,
};
use stores_db::Database;
use stores_sync::{
    parse_all, to_fields, AccessError, AccessResult, AccessState, Collection, DataAccess,
    Document, FailoverReason, HttpTransport, InitialDecision, RealtimeAccess, RealtimeStrategy,
    RestStrategy, Snapshot, StoresConfig, StrategyKind, StrategySelector, Subscription, Transition,
};

use crate::activity::{
    self, ActivityAction, ActivityEntry, ActivityLogger, ActivitySink, CollectionActivitySink,
};
use crate::actor::{ActorProvider, SessionActor};
use crate::error::{InventoryError, InventoryResult};
use crate::events::{InventoryEventEmitter, NoOpEventEmitter};
use crate::ledger::{LedgerEngine, LedgerOutcome};
use crate::records::RecordsStore;

/// Default wait for the first real-time snapshot.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Cache
// =============================================================================

#[derive(Debug, Default)]
struct Cache {
    items: Vec<Item>,
    categories: Vec<Category>,
    /// Newest first.
    transactions: Vec<Transaction>,
    /// Lowest revision a pushed snapshot must carry to be applied.
    floors: HashMap<Collection, u64>,
}

impl Cache {
    fn apply(&mut self, collection: Collection, docs: &[Document]) -> usize {
        match collection {
            Collection::Items => {
                self.items = parse_all(collection, docs);
                self.items.len()
            }
            Collection::Categories => {
                self.categories = parse_all(collection, docs);
                self.categories.len()
            }
            Collection::Transactions => {
                self.transactions = parse_all(collection, docs);
                sort_newest_first(&mut self.transactions);
                self.transactions.len()
            }
            other => {
                debug!(collection = %other, "Ignoring snapshot for uncached collection");
                0
            }
        }
    }

    /// Applies a pushed snapshot unless it was listed before one of our
    /// own writes to the collection. Returns the new count if applied.
    fn apply_pushed(&mut self, collection: Collection, snapshot: &Snapshot) -> Option<usize> {
        let floor = self.floors.get(&collection).copied().unwrap_or(0);
        if snapshot.revision < floor {
            return None;
        }
        Some(self.apply(collection, &snapshot.documents))
    }

    fn raise_floor(&mut self, collection: Collection, revision: u64) {
        let floor = self.floors.entry(collection).or_insert(0);
        *floor = (*floor).max(revision);
    }

    fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    fn upsert_item(&mut self, item: Item) {
        match self.items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    fn set_stock(&mut self, item_id: &str, stock: i64) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.stock = stock;
        }
    }

    fn prepend_transaction(&mut self, transaction: Transaction) {
        self.transactions.retain(|t| t.id != transaction.id);
        self.transactions.insert(0, transaction);
        sort_newest_first(&mut self.transactions);
    }

    /// Rejects a SKU already used by a different item.
    fn check_sku_free(&self, sku: &str, except_id: Option<&str>) -> Result<(), ValidationError> {
        let wanted = normalize_sku(sku);
        let taken = self
            .items
            .iter()
            .any(|i| Some(i.id.as_str()) != except_id && i.normalized_sku() == wanted);
        if taken {
            return Err(ValidationError::Duplicate {
                field: "sku".to_string(),
                value: sku.trim().to_string(),
            });
        }
        Ok(())
    }
}

fn sort_newest_first(transactions: &mut [Transaction]) {
    // Stable, so equal timestamps keep insertion order.
    transactions.sort_by(|a, b| b.date.cmp(&a.date));
}

// =============================================================================
// Store
// =============================================================================

struct StoreInner {
    realtime: Option<Realtime>,
    rest: Arc<dyn DataAccess>,
    selector: Mutex<StrategySelector>,
    cache: RwLock<Cache>,
    ledger: LedgerEngine,
    ledger_lock: tokio::sync::Mutex<()>,
    actor: Arc<dyn ActorProvider>,
    emitter: Arc<dyn InventoryEventEmitter>,
    activity: ActivityLogger,
    records: RecordsStore,
    probe_timeout: Duration,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

/// The real-time strategy, seen through both of its traits.
#[derive(Clone)]
struct Realtime {
    access: Arc<dyn DataAccess>,
    watch: Arc<dyn RealtimeAccess>,
}

/// Cached inventory with item CRUD and stock movements.
///
/// Cheap to clone; clones share one cache and one connection state.
#[derive(Clone)]
pub struct InventoryStore {
    inner: Arc<StoreInner>,
}

impl InventoryStore {
    pub fn builder(rest: Arc<dyn DataAccess>) -> InventoryStoreBuilder {
        InventoryStoreBuilder::new(rest)
    }

    /// Wires both strategies from configuration and connects.
    pub async fn connect_with_config(
        config: &StoresConfig,
        actor: Arc<dyn ActorProvider>,
        prior_failures: u32,
    ) -> InventoryResult<Self> {
        let transport = HttpTransport::new(&config.rest.base_url, config.request_timeout())?;
        let rest: Arc<dyn DataAccess> =
            Arc::new(RestStrategy::new(Arc::new(transport)).page_size(config.rest.page_size));

        let selector = StrategySelector::from_config(config, prior_failures);
        let probing = selector.state() == AccessState::Probing;
        let mut builder = Self::builder(rest)
            .with_selector(selector)
            .probe_timeout(config.probe_timeout())
            .with_actor(actor);

        if probing {
            match Database::new(config.db_config()).await {
                Ok(db) => builder = builder.with_realtime(Arc::new(RealtimeStrategy::new(db))),
                Err(e) => warn!(error = %e, "Embedded store unavailable, real-time disabled"),
            }
        }

        builder.connect().await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn items(&self) -> Vec<Item> {
        self.inner.cache.read().await.items.clone()
    }

    pub async fn item(&self, id: &str) -> Option<Item> {
        self.inner.cache.read().await.item(id).cloned()
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.inner.cache.read().await.categories.clone()
    }

    /// Newest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.inner.cache.read().await.transactions.clone()
    }

    /// Name of an item, or its raw id once the item is gone.
    pub async fn item_label(&self, item_id: &str) -> String {
        let cache = self.inner.cache.read().await;
        report::item_label(&cache.items, item_id).to_string()
    }

    pub async fn search(&self, query: &str, category: Option<&str>) -> Vec<Item> {
        let cache = self.inner.cache.read().await;
        report::search_items(&cache.items, query, category)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn dashboard(&self) -> DashboardSummary {
        let cache = self.inner.cache.read().await;
        DashboardSummary::build(&cache.items, &cache.transactions)
    }

    pub async fn alerts(&self) -> StockAlerts {
        StockAlerts::from_items(&self.inner.cache.read().await.items)
    }

    pub async fn audit_summary(&self) -> AuditSummary {
        let cache = self.inner.cache.read().await;
        AuditSummary::build(&cache.items, &cache.transactions)
    }

    pub fn access_state(&self) -> AccessState {
        self.inner.selector_state()
    }

    pub fn failover_reason(&self) -> Option<FailoverReason> {
        self.inner.lock_selector().failover_reason().cloned()
    }

    /// Re-fetches all three collections through the active strategy.
    ///
    /// Needed for fresh data on the REST strategy, which has no push.
    pub async fn refresh(&self) -> InventoryResult<()> {
        let access = self.inner.active();
        for collection in Collection::LEDGER {
            let docs = self.inner.observe(access.list(collection).await).await?;
            self.inner.apply_snapshot(collection, &docs).await;
        }
        Ok(())
    }

    // =========================================================================
    // Item CRUD
    // =========================================================================

    /// Adds an item. Stock and reorder level default to 0.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn add_item(&self, input: NewItem) -> InventoryResult<Item> {
        let draft = validate_new_item(&input, Utc::now())?;
        self.inner.cache.read().await.check_sku_free(&draft.sku, None)?;

        let fields = to_fields(&draft)?;
        let access = self.inner.active();
        let doc = self.inner.observe(access.create(Collection::Items, fields).await).await?;

        let item = draft.into_item(doc.id);
        {
            let mut cache = self.inner.cache.write().await;
            cache.upsert_item(item.clone());
            self.inner.hold_back_older_pushes(access.as_ref(), &mut cache, &[Collection::Items]);
        }
        self.inner.emit_count(Collection::Items).await;
        info!(item_id = %item.id, "Item added");

        self.inner.log(
            ActivityAction::ItemCreated,
            format!("Added item {} ({})", item.name, item.sku),
            &item.id,
        );
        Ok(item)
    }

    /// Edits an item's descriptive fields. Stock is never touched here.
    #[instrument(skip(self, patch))]
    pub async fn update_item(&self, id: &str, patch: ItemPatch) -> InventoryResult<Item> {
        let changes = validate_item_patch(&patch)?;
        {
            let cache = self.inner.cache.read().await;
            if cache.item(id).is_none() {
                return Err(InventoryError::item_not_found(id));
            }
            if let Some(sku) = &changes.sku {
                cache.check_sku_free(sku, Some(id))?;
            }
        }

        let fields = to_fields(&changes)?;
        let access = self.inner.active();
        self.inner
            .observe(access.update(Collection::Items, id, fields).await)
            .await?;

        let updated = {
            let mut cache = self.inner.cache.write().await;
            self.inner.hold_back_older_pushes(access.as_ref(), &mut cache, &[Collection::Items]);
            let item = cache
                .items
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| InventoryError::item_not_found(id))?;
            changes.apply_to(item);
            item.clone()
        };
        self.inner.emit_count(Collection::Items).await;

        self.inner.log(
            ActivityAction::ItemUpdated,
            format!("Updated item {}", updated.name),
            &updated.id,
        );
        Ok(updated)
    }

    /// Removes an item. Its transactions stay, pointing at a missing id.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: &str) -> InventoryResult<()> {
        let access = self.inner.active();
        self.inner
            .observe(access.remove(Collection::Items, id).await)
            .await?;

        let removed = {
            let mut cache = self.inner.cache.write().await;
            self.inner.hold_back_older_pushes(access.as_ref(), &mut cache, &[Collection::Items]);
            let position = cache.items.iter().position(|i| i.id == id);
            position.map(|p| cache.items.remove(p))
        };
        self.inner.emit_count(Collection::Items).await;

        let name = removed.map(|i| i.name).unwrap_or_else(|| id.to_string());
        self.inner.log(ActivityAction::ItemDeleted, format!("Deleted item {}", name), id);
        Ok(())
    }

    // =========================================================================
    // Stock Movements
    // =========================================================================

    /// Receives or issues stock.
    ///
    /// The movement is planned from the item as stored, read under the
    /// ledger lock. On success the cached item carries the new stock and the
    /// transaction heads the cached ledger. A [`InventoryError::PartialWrite`]
    /// means the stock moved but the ledger entry is missing; the cache
    /// reflects the moved stock.
    pub async fn record_transaction(&self, input: TransactionInput) -> InventoryResult<Transaction> {
        let _serial = self.inner.ledger_lock.lock().await;

        let actor = self.inner.actor.current_actor();
        let access = self.inner.active();
        let item = self.inner.stored_item(access.as_ref(), &input.item_id).await?;

        let outcome = self
            .inner
            .ledger
            .record(access.as_ref(), item.as_ref(), &input, &actor)
            .await;

        match outcome {
            Ok(LedgerOutcome::Applied {
                transaction,
                new_stock,
            }) => {
                self.inner.write_succeeded();
                {
                    let mut cache = self.inner.cache.write().await;
                    cache.set_stock(&transaction.item_id, new_stock);
                    cache.prepend_transaction(transaction.clone());
                    self.inner.hold_back_older_pushes(
                        access.as_ref(),
                        &mut cache,
                        &[Collection::Items, Collection::Transactions],
                    );
                }
                self.inner.emit_count(Collection::Items).await;
                self.inner.emit_count(Collection::Transactions).await;
                Ok(transaction)
            }
            Ok(LedgerOutcome::PartiallyApplied(partial)) => {
                self.inner
                    .cache
                    .write()
                    .await
                    .set_stock(&partial.item_id, partial.new_stock);
                self.inner.emit_count(Collection::Items).await;
                let err = InventoryError::PartialWrite(Box::new(partial));
                self.inner.emitter.emit_error(&err.user_message());
                self.inner.write_failed(&err).await;
                Err(err)
            }
            Err(err) => {
                self.inner.write_failed(&err).await;
                Err(err)
            }
        }
    }

    // =========================================================================
    // Side Registers
    // =========================================================================

    /// Letters register sharing this store's actor and activity log.
    ///
    /// Every call hands out the same register and cache. Always reads over
    /// REST; the register has no push feed, so it is empty until refreshed.
    pub fn records(&self) -> RecordsStore {
        self.inner.records.clone()
    }

    /// Latest activity log entries, newest first.
    ///
    /// Waits for this store's queued entries to be written first.
    pub async fn recent_activity(&self, limit: usize) -> InventoryResult<Vec<ActivityEntry>> {
        self.inner.activity.flush().await;
        Ok(activity::recent_activity(self.inner.rest.as_ref(), limit).await?)
    }

    /// Waits until queued activity entries have been handed to the sink.
    pub async fn flush_activity(&self) {
        self.inner.activity.flush().await;
    }

    /// Stops listening for pushes. Further reads serve the last cache.
    /// Queued activity entries are not flushed; call `flush_activity` first.
    pub fn shutdown(&self) {
        self.inner.stop_listeners();
    }
}

// =============================================================================
// Inner: connection state and failover
// =============================================================================

impl StoreInner {
    fn lock_selector(&self) -> std::sync::MutexGuard<'_, StrategySelector> {
        self.selector.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn selector_state(&self) -> AccessState {
        self.lock_selector().state()
    }

    /// The strategy that serves reads and writes right now.
    fn active(&self) -> Arc<dyn DataAccess> {
        match (self.lock_selector().active_strategy(), &self.realtime) {
            (StrategyKind::RealTime, Some(rt)) => rt.access.clone(),
            _ => self.rest.clone(),
        }
    }

    /// Feeds a write result to the selector and converts the error.
    async fn observe<T>(&self, result: AccessResult<T>) -> InventoryResult<T> {
        match result {
            Ok(value) => {
                self.write_succeeded();
                Ok(value)
            }
            Err(e) => {
                let err = InventoryError::from(e);
                self.write_failed(&err).await;
                Err(err)
            }
        }
    }

    /// Reads an item as stored and refreshes its cached copy.
    async fn stored_item(
        &self,
        access: &dyn DataAccess,
        id: &str,
    ) -> InventoryResult<Option<Item>> {
        let doc = self.observe(access.get(Collection::Items, id).await).await?;
        let item = doc.and_then(|doc| {
            parse_all::<Item>(Collection::Items, std::slice::from_ref(&doc))
                .into_iter()
                .next()
        });
        if let Some(item) = &item {
            self.cache.write().await.upsert_item(item.clone());
        }
        Ok(item)
    }

    /// After a write through `access`, ignore pushes listed before it.
    fn hold_back_older_pushes(
        &self,
        access: &dyn DataAccess,
        cache: &mut Cache,
        collections: &[Collection],
    ) {
        if access.kind() != StrategyKind::RealTime {
            return;
        }
        let Some(realtime) = &self.realtime else { return };
        for &collection in collections {
            cache.raise_floor(collection, realtime.watch.revision(collection));
        }
    }

    fn write_succeeded(&self) {
        self.lock_selector().on_write_success();
    }

    async fn write_failed(&self, err: &InventoryError) {
        let Some(access_err) = err.access_error() else {
            return;
        };
        let transition = self.lock_selector().on_write_error(access_err);
        if let Transition::FailOver(reason) = transition {
            // Reported by fail_over; the caller sees its own write error.
            let _ = self.fail_over(reason).await;
        }
    }

    fn log(&self, action: ActivityAction, details: String, item_id: &str) {
        let actor = self.actor.current_actor();
        self.activity
            .log(ActivityEntry::new(action, details, &actor).target("item", item_id));
    }

    async fn emit_count(&self, collection: Collection) {
        let cache = self.cache.read().await;
        let count = match collection {
            Collection::Items => cache.items.len(),
            Collection::Categories => cache.categories.len(),
            Collection::Transactions => cache.transactions.len(),
            _ => return,
        };
        self.emitter.emit_snapshot(collection, count);
    }

    async fn apply_snapshot(&self, collection: Collection, docs: &[Document]) {
        let count = self.cache.write().await.apply(collection, docs);
        debug!(collection = %collection, count, "Snapshot applied");
        self.emitter.emit_snapshot(collection, count);
    }

    async fn apply_pushed(&self, collection: Collection, snapshot: &Snapshot) {
        let applied = self.cache.write().await.apply_pushed(collection, snapshot);
        match applied {
            Some(count) => {
                debug!(collection = %collection, count, revision = snapshot.revision, "Push applied");
                self.emitter.emit_snapshot(collection, count);
            }
            None => debug!(
                collection = %collection,
                revision = snapshot.revision,
                "Dropped push listed before our own write"
            ),
        }
    }

    fn stop_listeners(&self) {
        let listeners = std::mem::take(&mut *self.listeners.lock().unwrap_or_else(|p| p.into_inner()));
        for task in listeners {
            task.abort();
        }
    }

    /// Loads all three collections over REST, exactly once per call.
    async fn fetch_all_rest(&self) -> InventoryResult<()> {
        for collection in Collection::LEDGER {
            let docs = self.rest.list(collection).await?;
            self.apply_snapshot(collection, &docs).await;
        }
        Ok(())
    }

    /// Tears down real-time listeners and reloads everything over REST.
    ///
    /// Only called on a `Transition::FailOver`, which the selector hands out
    /// once per session. A failed fetch is logged and emitted before it is
    /// returned.
    async fn fail_over(&self, reason: FailoverReason) -> InventoryResult<()> {
        self.stop_listeners();
        self.emitter
            .emit_access_state(AccessState::Rest, Some(&reason));
        info!(reason = %reason, "Switched to REST strategy");

        self.fetch_all_rest().await.map_err(|e| {
            error!(error = %e, "Initial REST fetch after failover failed");
            self.emitter.emit_error(&e.user_message());
            e
        })
    }

    /// Subscribes to the three collections and waits for their first snapshots.
    async fn probe(self: &Arc<Self>, realtime: &Realtime) -> InventoryResult<()> {
        let mut subscriptions = Vec::with_capacity(Collection::LEDGER.len());
        for collection in Collection::LEDGER {
            match realtime.watch.subscribe(collection).await {
                Ok(sub) => subscriptions.push(sub),
                Err(e) => return self.probe_failed(e).await,
            }
        }

        let first_snapshots = async {
            let mut snapshots = Vec::with_capacity(subscriptions.len());
            for sub in subscriptions.iter_mut() {
                match sub.next_snapshot().await {
                    Some(Ok(snapshot)) => snapshots.push((sub.collection(), snapshot.documents)),
                    Some(Err(e)) => return Err(e),
                    None => return Err(AccessError::SubscriptionClosed),
                }
            }
            Ok(snapshots)
        };

        let probed = tokio::time::timeout(self.probe_timeout, first_snapshots).await;
        match probed {
            Ok(Ok(snapshots)) => {
                let transition = self.lock_selector().on_first_snapshot();
                if transition != Transition::EnterRealTime {
                    return Ok(());
                }
                for (collection, docs) in &snapshots {
                    self.apply_snapshot(*collection, docs).await;
                }
                self.spawn_listeners(subscriptions);
                self.emitter.emit_access_state(AccessState::RealTime, None);
                info!("Real-time strategy active");
                Ok(())
            }
            Ok(Err(e)) => {
                drop(subscriptions);
                self.probe_failed(e).await
            }
            Err(_) => {
                drop(subscriptions);
                warn!(timeout_ms = self.probe_timeout.as_millis() as u64, "Real-time probe timed out");
                let transition = self.lock_selector().on_probe_timeout();
                match transition {
                    Transition::FailOver(reason) => self.fail_over(reason).await,
                    _ => Ok(()),
                }
            }
        }
    }

    async fn probe_failed(&self, error: AccessError) -> InventoryResult<()> {
        warn!(error = %error, "Real-time probe failed");
        let transition = self.lock_selector().on_subscription_error(&error);
        match transition {
            Transition::FailOver(reason) => self.fail_over(reason).await,
            _ => Ok(()),
        }
    }

    fn spawn_listeners(self: &Arc<Self>, subscriptions: Vec<Subscription>) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        for sub in subscriptions {
            listeners.push(tokio::spawn(listen(Arc::downgrade(self), sub)));
        }
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.stop_listeners();
    }
}

/// Applies pushed snapshots until the feed fails or the store goes away.
async fn listen(store: Weak<StoreInner>, mut subscription: Subscription) {
    let collection = subscription.collection();

    let error = loop {
        match subscription.next_snapshot().await {
            Some(Ok(snapshot)) => {
                let Some(inner) = store.upgrade() else { return };
                inner.apply_pushed(collection, &snapshot).await;
            }
            Some(Err(e)) => break e,
            None => break AccessError::SubscriptionClosed,
        }
    };

    let Some(inner) = store.upgrade() else { return };
    warn!(collection = %collection, error = %error, "Real-time subscription failed");
    let transition = inner.lock_selector().on_subscription_error(&error);
    if let Transition::FailOver(reason) = transition {
        // Failing over aborts every listener, this one included, so it runs
        // on its own task.
        tokio::spawn(async move {
            let _ = inner.fail_over(reason).await;
        });
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`InventoryStore`].
pub struct InventoryStoreBuilder {
    rest: Arc<dyn DataAccess>,
    realtime: Option<Realtime>,
    selector: Option<StrategySelector>,
    probe_timeout: Duration,
    actor: Option<Arc<dyn ActorProvider>>,
    emitter: Option<Arc<dyn InventoryEventEmitter>>,
    activity_sink: Option<Arc<dyn ActivitySink>>,
}

impl InventoryStoreBuilder {
    pub fn new(rest: Arc<dyn DataAccess>) -> Self {
        InventoryStoreBuilder {
            rest,
            realtime: None,
            selector: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            actor: None,
            emitter: None,
            activity_sink: None,
        }
    }

    /// Sets the real-time strategy to probe.
    pub fn with_realtime<R>(mut self, realtime: Arc<R>) -> Self
    where
        R: RealtimeAccess + 'static,
    {
        self.realtime = Some(Realtime {
            access: realtime.clone(),
            watch: realtime,
        });
        self
    }

    /// Sets the starting selector. Defaults to probing with a threshold of 3.
    pub fn with_selector(mut self, selector: StrategySelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_actor(mut self, actor: Arc<dyn ActorProvider>) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn InventoryEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Defaults to the `audit_log` collection over the REST strategy.
    pub fn with_activity_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.activity_sink = Some(sink);
        self
    }

    /// Builds the store and loads its first data.
    ///
    /// Without a real-time strategy the store starts on REST.
    pub async fn connect(self) -> InventoryResult<InventoryStore> {
        let selector = match (self.selector, &self.realtime) {
            (Some(selector), Some(_)) => selector,
            (None, Some(_)) => StrategySelector::new(InitialDecision::Probe, 3),
            (_, None) => StrategySelector::new(
                InitialDecision::Rest(FailoverReason::RealtimeDisallowed),
                3,
            ),
        };

        let sink = self
            .activity_sink
            .unwrap_or_else(|| Arc::new(CollectionActivitySink::new(self.rest.clone())));
        let activity = ActivityLogger::new(sink);
        let actor = self.actor.unwrap_or_else(|| Arc::new(SessionActor::anonymous()));
        let records = RecordsStore::new(self.rest.clone(), actor.clone(), activity.clone());

        let inner = Arc::new(StoreInner {
            realtime: self.realtime,
            rest: self.rest,
            selector: Mutex::new(selector),
            cache: RwLock::new(Cache::default()),
            ledger: LedgerEngine::new(activity.clone()),
            ledger_lock: tokio::sync::Mutex::new(()),
            actor,
            emitter: self.emitter.unwrap_or_else(|| Arc::new(NoOpEventEmitter)),
            activity,
            records,
            probe_timeout: self.probe_timeout,
            listeners: Mutex::new(Vec::new()),
        });

        match (inner.selector_state(), inner.realtime.clone()) {
            (AccessState::Probing, Some(realtime)) => inner.probe(&realtime).await?,
            _ => {
                let reason = inner.lock_selector().failover_reason().cloned();
                inner.emitter.emit_access_state(AccessState::Rest, reason.as_ref());
                inner.fetch_all_rest().await?;
            }
        }

        info!(state = %inner.selector_state(), "Inventory store connected");
        Ok(InventoryStore { inner })
    }
}
