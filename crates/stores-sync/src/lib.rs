//! # stores-sync: Data Access Layer for the Stores Ledger
//!
//! Two interchangeable ways to reach the persisted collections, and the
//! selector that decides which one is live.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Data Access Architecture                          │
//! │                                                                         │
//! │   Inventory Store (stores-inventory)                                   │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 dyn DataAccess (uniform contract)                │  │
//! │  └─────────────┬──────────────────────────────────┬─────────────────┘  │
//! │                │                                  │                     │
//! │                ▼                                  ▼                     │
//! │  ┌────────────────────────┐          ┌────────────────────────────┐    │
//! │  │   RealtimeStrategy     │          │      RestStrategy          │    │
//! │  │                        │          │                            │    │
//! │  │ stores-db (SQLite)     │          │ dyn RestTransport          │    │
//! │  │ broadcast change feed  │          │  ├─ HttpTransport (reqwest)│    │
//! │  │ subscribe() snapshots  │          │  └─ MemoryRestTransport    │    │
//! │  │ atomic batch           │          │ field masks, pagination    │    │
//! │  └────────────────────────┘          │ sequential batch           │    │
//! │                                      └────────────────────────────┘    │
//! │                                                                         │
//! │  StrategySelector: Probing → RealTime | Rest  (pure decisions)         │
//! │  StoresConfig:     defaults → stores.toml → STORES_* env               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`access`] - `DataAccess` / `RealtimeAccess` traits, `Subscription`
//! - [`document`] - collections, untyped documents, batch writes
//! - [`realtime`] - push strategy over the embedded store
//! - [`rest`] - pull strategy, wire codec, transports
//! - [`selector`] - startup decision and failover state machine
//! - [`config`] - access configuration
//! - [`error`] - access error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stores_sync::{RealtimeStrategy, StoresConfig, StrategySelector};
//! use stores_db::Database;
//!
//! let config = StoresConfig::load_or_default(None);
//! let selector = StrategySelector::from_config(&config, 0);
//! let realtime = RealtimeStrategy::new(Database::new(config.db_config()).await?);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod config;
pub mod document;
pub mod error;
pub mod realtime;
pub mod rest;
pub mod selector;

// =============================================================================
// Re-exports
// =============================================================================

pub use access::{DataAccess, RealtimeAccess, Snapshot, StrategyKind, Subscription};
pub use config::{AccessMode, StoresConfig};
pub use document::{parse_all, to_fields, Collection, Document, WriteOp};
pub use error::{AccessError, AccessResult};
pub use realtime::RealtimeStrategy;
pub use rest::{
    HttpTransport, InjectedFailure, MemoryRestTransport, Method, RestRequest, RestResponse,
    RestStrategy, RestTransport,
};
pub use selector::{
    decide_initial, AccessState, FailoverReason, InitialDecision, StrategySelector, Transition,
};
