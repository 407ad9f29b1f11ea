//! # stores-core: Pure Business Logic for the Stores Ledger
//!
//! This crate is the **heart** of the stores ledger. It contains the record
//! types, validation rules, and balance arithmetic as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stores Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web UI (stores department)                   │   │
//! │  │   Inventory ──► Receive ──► Issue ──► Alerts ──► Audit rollup  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           stores-inventory (Inventory Store, Ledger Engine)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stores-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  ledger   │  │  report   │  │ validation│  │   │
//! │  │   │   Item    │  │ plan +    │  │  alerts   │  │   rules   │  │   │
//! │  │   │Transaction│  │ balance   │  │  rollups  │  │  coercion │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Persisted records (Item, Category, Transaction) and inputs
//! - [`ledger`] - Stock movement planning and ledger-derived balances
//! - [`report`] - Stock classification, alerts, dashboard and audit rollups
//! - [`letters`] - Correspondence records
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation and numeric coercion
//!
//! ## Example Usage
//!
//! ```rust
//! use stores_core::report::StockStatus;
//!
//! assert_eq!(StockStatus::classify(0, 5), StockStatus::OutOfStock);
//! assert_eq!(StockStatus::classify(3, 5).label(), "Low Stock");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod letters;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::MovementPlan;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Display name stamped on transactions when no actor name is known.
pub const UNKNOWN_ACTOR: &str = "Unknown";

/// Number of transactions shown in the dashboard's recent activity table.
pub const RECENT_TRANSACTIONS_LIMIT: usize = 10;

/// Maximum length of free-text names (item name, SKU, category, unit).
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of a SKU.
pub const MAX_SKU_LEN: usize = 50;
