//! # Documents and Collections
//!
//! The untyped currency of the data access layer. Strategies move
//! [`Document`]s; typed records only appear once a document is parsed at the
//! boundary, so a malformed document is caught on every read.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use stores_db::{DocumentRecord, JsonMap};

use crate::error::{AccessError, AccessResult};

// =============================================================================
// Collection
// =============================================================================

/// Named collections the ledger reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Items,
    Categories,
    Transactions,
    Users,
    AuditLog,
    Letters,
}

impl Collection {
    /// The three collections the Inventory Store keeps cached.
    pub const LEDGER: [Collection; 3] = [
        Collection::Items,
        Collection::Categories,
        Collection::Transactions,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Items => "items",
            Collection::Categories => "categories",
            Collection::Transactions => "transactions",
            Collection::Users => "users",
            Collection::AuditLog => "audit_log",
            Collection::Letters => "letters",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "items" => Ok(Collection::Items),
            "categories" => Ok(Collection::Categories),
            "transactions" => Ok(Collection::Transactions),
            "users" => Ok(Collection::Users),
            "audit_log" => Ok(Collection::AuditLog),
            "letters" => Ok(Collection::Letters),
            other => Err(AccessError::Decode(format!("Unknown collection: {}", other))),
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A document: its id plus a JSON body that does not repeat the id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: JsonMap,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: JsonMap) -> Self {
        Document {
            id: id.into(),
            fields,
        }
    }

    /// Builds a document from a serializable record, lifting out its `id`.
    pub fn from_record<T: Serialize>(record: &T) -> AccessResult<Self> {
        let mut fields = to_fields(record)?;
        let id = match fields.remove("id") {
            Some(Value::String(id)) => id,
            _ => String::new(),
        };
        Ok(Document { id, fields })
    }

    /// Parses the document into a typed record, injecting the id.
    pub fn parse<T: DeserializeOwned>(&self) -> AccessResult<T> {
        let mut body = self.fields.clone();
        body.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(body))
            .map_err(|e| AccessError::Decode(format!("{}: {}", self.id, e)))
    }
}

impl From<DocumentRecord> for Document {
    fn from(record: DocumentRecord) -> Self {
        Document {
            id: record.id,
            fields: record.data,
        }
    }
}

/// Serializes a record or draft into a document body.
pub fn to_fields<T: Serialize>(value: &T) -> AccessResult<JsonMap> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AccessError::Decode(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Parses every document, skipping (and logging) the ones that don't fit.
pub fn parse_all<T: DeserializeOwned>(collection: Collection, docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.parse::<T>() {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection = %collection, id = %doc.id, error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}

// =============================================================================
// Writes
// =============================================================================

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace a document with a known id.
    Set {
        collection: Collection,
        id: String,
        fields: JsonMap,
    },
    /// Overwrite only the given fields of an existing document.
    Update {
        collection: Collection,
        id: String,
        fields: JsonMap,
    },
}

impl WriteOp {
    pub fn collection(&self) -> Collection {
        match self {
            WriteOp::Set { collection, .. } | WriteOp::Update { collection, .. } => *collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Set { id, .. } | WriteOp::Update { id, .. } => id,
        }
    }
}
