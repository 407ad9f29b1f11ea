//! # stores-inventory: Inventory Store and Ledger Engine
//!
//! The stateful half of the stores ledger: a cached view of the inventory
//! that stays current over whichever data access strategy is healthy, and
//! the only code path that moves stock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         stores-inventory                                │
//! │                                                                         │
//! │   InventoryStore ─────────────┬──────────────┬──────────────────┐      │
//! │     cache (items, categories, │              │                  │      │
//! │     transactions)             ▼              ▼                  ▼      │
//! │                         LedgerEngine   StrategySelector   ActivityLogger│
//! │                         (stock+entry)  (stores-sync)      (audit_log)  │
//! │                               │              │                         │
//! │                               ▼              ▼                         │
//! │                     dyn DataAccess: RealtimeStrategy | RestStrategy    │
//! │                                                                         │
//! │   RecordsStore ──► letters register over REST                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stores_core::{Actor, TransactionInput};
//! use stores_inventory::{InventoryStore, SessionActor};
//! use stores_sync::StoresConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoresConfig::load_or_default(None);
//! let actor = Arc::new(SessionActor::new(Actor::authenticated("u1", "Stores Officer")));
//! let store = InventoryStore::connect_with_config(&config, actor, 0).await?;
//!
//! store
//!     .record_transaction(TransactionInput::issue("item-1", 5).with_department("IT"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod actor;
pub mod error;
pub mod events;
pub mod ledger;
pub mod records;
pub mod store;

pub use activity::{
    recent_activity, ActivityAction, ActivityEntry, ActivityLogger, ActivitySink,
    CollectionActivitySink, NoOpActivitySink,
};
pub use actor::{ActorProvider, SessionActor};
pub use error::{
    ErrorCode, ErrorPayload, InventoryError, InventoryResult, PartialWrite, PARTIAL_WRITE_MESSAGE,
    TRANSPORT_MESSAGE,
};
pub use events::{InventoryEventEmitter, NoOpEventEmitter};
pub use ledger::{LedgerEngine, LedgerOutcome};
pub use records::RecordsStore;
pub use store::{InventoryStore, InventoryStoreBuilder, DEFAULT_PROBE_TIMEOUT};
