//! # Data Access Contract
//!
//! The uniform async contract both strategies satisfy.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DataAccess                                      │
//! │                                                                         │
//! │  list(collection)          all documents, order NOT guaranteed         │
//! │  get(collection, id)       one document, None if absent                │
//! │  create(collection, body)  storage assigns the id                      │
//! │  update(c, id, fields)     only the given fields change                │
//! │  remove(c, id)             idempotent, absent counts as success        │
//! │  batch([writes])           atomic iff atomic_batches()                 │
//! │                                                                         │
//! │                    RealtimeAccess: DataAccess                           │
//! │                                                                         │
//! │  subscribe(collection)     full snapshot now, then on every change     │
//! │  revision(collection)      counter bumped after every committed write  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Strategies
//! - [`crate::realtime::RealtimeStrategy`] - push, atomic batches
//! - [`crate::rest::RestStrategy`] - pull, sequential batches

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use stores_db::JsonMap;

use crate::document::{Collection, Document, WriteOp};
use crate::error::AccessResult;

// =============================================================================
// Strategy Kind
// =============================================================================

/// Which transport a strategy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    RealTime,
    Rest,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::RealTime => write!(f, "realtime"),
            StrategyKind::Rest => write!(f, "rest"),
        }
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Request/response access to persisted collections.
#[async_trait]
pub trait DataAccess: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Lists every document in a collection. Callers sort.
    async fn list(&self, collection: Collection) -> AccessResult<Vec<Document>>;

    /// Reads one document straight from storage.
    async fn get(&self, collection: Collection, id: &str) -> AccessResult<Option<Document>>;

    /// Creates a document and returns it with its assigned id.
    async fn create(&self, collection: Collection, fields: JsonMap) -> AccessResult<Document>;

    /// Overwrites exactly the given fields. Fails with `NotFound` if absent.
    async fn update(&self, collection: Collection, id: &str, fields: JsonMap) -> AccessResult<()>;

    /// Removes a document. Absent documents are not an error.
    async fn remove(&self, collection: Collection, id: &str) -> AccessResult<()>;

    /// Applies the writes in order.
    ///
    /// When [`DataAccess::atomic_batches`] is false a failure midway leaves
    /// earlier writes applied and surfaces as `AccessError::PartialBatch`.
    async fn batch(&self, writes: Vec<WriteOp>) -> AccessResult<()>;

    /// Whether [`DataAccess::batch`] is all-or-nothing.
    fn atomic_batches(&self) -> bool;
}

/// Push-based access: a strategy that can watch a collection.
#[async_trait]
pub trait RealtimeAccess: DataAccess {
    /// Starts watching a collection. The first item delivered is the current
    /// snapshot; later items follow every change.
    async fn subscribe(&self, collection: Collection) -> AccessResult<Subscription>;

    /// Per-collection write counter, bumped after each committed write.
    ///
    /// A [`Snapshot`] tagged with revision `r` was listed after every write
    /// to its collection that had committed by the time the counter read
    /// `r`. Strategies that do not count writes report 0.
    fn revision(&self, _collection: Collection) -> u64 {
        0
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// One pushed view of a whole collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// [`RealtimeAccess::revision`] read just before listing.
    pub revision: u64,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(revision: u64, documents: Vec<Document>) -> Self {
        Snapshot {
            revision,
            documents,
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A live watch on one collection.
///
/// Dropping the subscription stops the background watcher.
#[derive(Debug)]
pub struct Subscription {
    collection: Collection,
    rx: mpsc::Receiver<AccessResult<Snapshot>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wraps a snapshot channel and the task feeding it.
    pub fn from_channel(
        collection: Collection,
        rx: mpsc::Receiver<AccessResult<Snapshot>>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Subscription {
            collection,
            rx,
            task,
        }
    }

    /// A subscription fed by hand (test doubles, adapters).
    pub fn channel(
        collection: Collection,
        buffer: usize,
    ) -> (mpsc::Sender<AccessResult<Snapshot>>, Subscription) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Subscription::from_channel(collection, rx, None))
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Waits for the next snapshot. `None` once the feed has ended.
    pub async fn next_snapshot(&mut self) -> Option<AccessResult<Snapshot>> {
        self.rx.recv().await
    }

    /// Stops watching.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_subscription_delivers_in_order() {
        let (tx, mut sub) = Subscription::channel(Collection::Items, 4);
        tx.send(Ok(Snapshot::default())).await.unwrap();
        tx.send(Ok(Snapshot::new(2, vec![Document::new("I1", JsonMap::new())])))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(sub.collection(), Collection::Items);
        assert!(sub.next_snapshot().await.unwrap().unwrap().documents.is_empty());
        let second = sub.next_snapshot().await.unwrap().unwrap();
        assert_eq!(second.revision, 2);
        assert_eq!(second.documents.len(), 1);
        assert!(sub.next_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_aborts_watcher() {
        let (_tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(std::future::pending::<()>());
        let abort = task.abort_handle();
        let sub = Subscription::from_channel(Collection::Items, rx, Some(task));

        sub.unsubscribe();
        for _ in 0..10 {
            if abort.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }
}
