//! # stores-db: Embedded Document Store for the Stores Ledger
//!
//! This crate persists the ledger's collections in SQLite with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stores Ledger Data Flow                          │
//! │                                                                         │
//! │  RealtimeStrategy (stores-sync)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    stores-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │ DocumentRepository │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │◄───│ list / insert /    │  │ (embedded) │  │   │
//! │  │   │  SqlitePool   │    │ patch / batch      │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite: documents(collection, id, data JSON, created_at, updated_at) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stores_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stores.db")).await?;
//! let items = db.documents().list("items").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{DocumentRecord, DocumentRepository, DocumentWrite, JsonMap};
