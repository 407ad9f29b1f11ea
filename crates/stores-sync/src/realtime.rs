//! # Real-Time Strategy
//!
//! Push-based access over the embedded document store.
//!
//! ## Change Feed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write (create / update / remove / batch)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  stores-db commit                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  revision[collection] += 1                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  broadcast::Sender<Collection> ──► watcher task per subscription       │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                                   read revision, re-list collection    │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                                   mpsc snapshot ──► Subscription       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Watchers subscribe to the feed before taking their first snapshot, so no
//! change between the two is lost. A lagging watcher re-lists rather than
//! replaying, since every snapshot is complete anyway.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use stores_db::{Database, DocumentWrite, JsonMap};

use crate::access::{DataAccess, RealtimeAccess, Snapshot, StrategyKind, Subscription};
use crate::document::{Collection, Document, WriteOp};
use crate::error::{AccessError, AccessResult};

const FEED_CAPACITY: usize = 256;
const SNAPSHOT_BUFFER: usize = 8;

/// Real-time strategy backed by SQLite.
///
/// Clones share the database and the change feed.
#[derive(Debug, Clone)]
pub struct RealtimeStrategy {
    db: Database,
    changes: broadcast::Sender<Collection>,
    revisions: Arc<Mutex<HashMap<Collection, u64>>>,
}

impl RealtimeStrategy {
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        RealtimeStrategy {
            db,
            changes,
            revisions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs after a commit: bump the revision, then wake watchers.
    fn notify(&self, collection: Collection) {
        *lock(&self.revisions).entry(collection).or_insert(0) += 1;
        // No receivers is fine: nobody is watching.
        let _ = self.changes.send(collection);
    }

    fn to_db_write(op: &WriteOp) -> DocumentWrite {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
            } => DocumentWrite::Upsert {
                collection: collection.as_str().to_string(),
                id: id.clone(),
                data: fields.clone(),
            },
            WriteOp::Update {
                collection,
                id,
                fields,
            } => DocumentWrite::Patch {
                collection: collection.as_str().to_string(),
                id: id.clone(),
                fields: fields.clone(),
            },
        }
    }
}

fn lock(revisions: &Mutex<HashMap<Collection, u64>>) -> MutexGuard<'_, HashMap<Collection, u64>> {
    revisions.lock().unwrap_or_else(|p| p.into_inner())
}

fn current(revisions: &Mutex<HashMap<Collection, u64>>, collection: Collection) -> u64 {
    lock(revisions).get(&collection).copied().unwrap_or(0)
}

#[async_trait]
impl DataAccess for RealtimeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RealTime
    }

    async fn list(&self, collection: Collection) -> AccessResult<Vec<Document>> {
        let records = self.db.documents().list(collection.as_str()).await?;
        Ok(records.into_iter().map(Document::from).collect())
    }

    async fn get(&self, collection: Collection, id: &str) -> AccessResult<Option<Document>> {
        let record = self.db.documents().get(collection.as_str(), id).await?;
        Ok(record.map(Document::from))
    }

    async fn create(&self, collection: Collection, fields: JsonMap) -> AccessResult<Document> {
        let id = Uuid::new_v4().to_string();
        self.db
            .documents()
            .insert(collection.as_str(), &id, &fields)
            .await?;
        self.notify(collection);
        debug!(collection = %collection, id = %id, "Document created");
        Ok(Document::new(id, fields))
    }

    async fn update(&self, collection: Collection, id: &str, fields: JsonMap) -> AccessResult<()> {
        self.db
            .documents()
            .patch(collection.as_str(), id, &fields)
            .await?;
        self.notify(collection);
        Ok(())
    }

    async fn remove(&self, collection: Collection, id: &str) -> AccessResult<()> {
        let existed = self.db.documents().delete(collection.as_str(), id).await?;
        if existed {
            self.notify(collection);
        } else {
            debug!(collection = %collection, id = %id, "Remove of absent document");
        }
        Ok(())
    }

    async fn batch(&self, writes: Vec<WriteOp>) -> AccessResult<()> {
        let db_writes: Vec<DocumentWrite> = writes.iter().map(Self::to_db_write).collect();
        self.db.documents().apply_batch(&db_writes).await?;

        let mut touched: Vec<Collection> = writes.iter().map(WriteOp::collection).collect();
        touched.sort();
        touched.dedup();
        for collection in touched {
            self.notify(collection);
        }
        Ok(())
    }

    fn atomic_batches(&self) -> bool {
        true
    }
}

#[async_trait]
impl RealtimeAccess for RealtimeStrategy {
    async fn subscribe(&self, collection: Collection) -> AccessResult<Subscription> {
        let mut feed = self.changes.subscribe();
        let repo = self.db.documents();
        let revisions = self.revisions.clone();
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);

        let task = tokio::spawn(async move {
            loop {
                let seen = current(&revisions, collection);
                let snapshot = repo
                    .list(collection.as_str())
                    .await
                    .map(|records| {
                        Snapshot::new(seen, records.into_iter().map(Document::from).collect())
                    })
                    .map_err(AccessError::from);
                let failed = snapshot.is_err();

                if tx.send(snapshot).await.is_err() {
                    debug!(collection = %collection, "Subscriber gone, stopping watcher");
                    return;
                }
                if failed {
                    warn!(collection = %collection, "Snapshot failed, watcher stopping");
                    return;
                }

                loop {
                    match feed.recv().await {
                        Ok(changed) if changed == collection => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(collection = %collection, skipped, "Change feed lagged, re-listing");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            let _ = tx.send(Err(AccessError::SubscriptionClosed)).await;
                            return;
                        }
                    }
                }
            }
        });

        debug!(collection = %collection, "Subscribed");
        Ok(Subscription::from_channel(collection, rx, Some(task)))
    }

    fn revision(&self, collection: Collection) -> u64 {
        current(&self.revisions, collection)
    }
}
