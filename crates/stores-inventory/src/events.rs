//! Store notifications for a UI layer.

use stores_sync::{AccessState, Collection, FailoverReason};

/// Receives store events (implemented by whatever renders the store).
pub trait InventoryEventEmitter: Send + Sync {
    /// A collection's cached contents changed.
    fn emit_snapshot(&self, collection: Collection, count: usize);

    /// The active data access strategy changed.
    fn emit_access_state(&self, state: AccessState, reason: Option<&FailoverReason>);

    /// A background failure the user should know about.
    fn emit_error(&self, message: &str);
}

/// No-op event emitter for testing.
pub struct NoOpEventEmitter;

impl InventoryEventEmitter for NoOpEventEmitter {
    fn emit_snapshot(&self, _collection: Collection, _count: usize) {}
    fn emit_access_state(&self, _state: AccessState, _reason: Option<&FailoverReason>) {}
    fn emit_error(&self, _message: &str) {}
}
