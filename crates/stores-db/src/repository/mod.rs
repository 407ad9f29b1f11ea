//! # Repository Module
//!
//! Database repository implementations for the stores ledger.
//!
//! All collections share one document table, so a single repository covers
//! items, categories, transactions, the audit log, and letters alike. Typed
//! parsing happens one layer up, at the data access boundary.
//!
//! ## Available Repositories
//!
//! - [`DocumentRepository`] - Document CRUD and atomic batches

pub mod documents;

pub use documents::{DocumentRecord, DocumentRepository, DocumentWrite, JsonMap};
