//! # Domain Types
//!
//! Records persisted by the stores ledger and the inputs that create them.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │   Transaction   │   │    Category     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (storage)   │   │  id (client)    │   │  id             │       │
//! │  │  sku (business) │   │  itemId (ref)   │   │  name           │       │
//! │  │  stock >= 0     │   │  type IN | OUT  │   └─────────────────┘       │
//! │  │  reorderLevel   │   │  quantity > 0   │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  Inputs (untrusted)          Drafts (validated, no id yet)              │
//! │  ─────────────────           ───────────────────────────               │
//! │  NewItem ──────────────────► ItemDraft ──► Item                         │
//! │  ItemPatch ────────────────► ItemChanges (field mask)                   │
//! │  TransactionInput ─────────► TransactionDraft ──► Transaction           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Shape
//! Field names are camelCase on the wire (`reorderLevel`, `itemId`,
//! `createdAt`). Timestamps are ISO-8601 strings with millisecond precision.
//! Integer fields accept `"12"` or `12.0` from documents written by older
//! clients, but are still validated on read: stock and reorder level must be
//! zero or more, a movement quantity must be positive. A record that fails
//! is rejected whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::UNKNOWN_ACTOR;

// =============================================================================
// Item
// =============================================================================

/// A catalog item with its current on-hand stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Item {
    /// Storage-assigned identifier.
    #[serde(default)]
    pub id: String,

    /// Display name.
    pub name: String,

    /// Business identifier, used as a secondary search key.
    pub sku: String,

    /// Category name (free reference to a [`Category`]).
    #[serde(default)]
    pub category: String,

    /// Unit-of-measure label ("Pcs", "Ream", ...).
    #[serde(default)]
    pub unit: String,

    /// On-hand quantity. Only the ledger mutates this.
    #[serde(default, deserialize_with = "stored_int::count::deserialize")]
    #[ts(type = "number")]
    pub stock: i64,

    /// Alerting threshold.
    #[serde(default, deserialize_with = "stored_int::count::deserialize")]
    #[ts(type = "number")]
    pub reorder_level: i64,

    /// Set once at creation. Seeded items carry none.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "iso8601::option"
    )]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Case-insensitive, trimmed SKU used for uniqueness checks.
    pub fn normalized_sku(&self) -> String {
        normalize_sku(&self.sku)
    }
}

/// Normalizes a SKU for comparison.
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_lowercase()
}

// =============================================================================
// Category
// =============================================================================

/// Read-mostly reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

// =============================================================================
// Transaction Type
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum TransactionType {
    /// Goods received into stores.
    In,
    /// Goods issued out to a department.
    Out,
}

impl TransactionType {
    /// Wire representation ("IN" / "OUT").
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IN" => Ok(TransactionType::In),
            "OUT" => Ok(TransactionType::Out),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Transaction {
    #[serde(default)]
    pub id: String,

    /// Item this movement applies to. May dangle after the item is deleted.
    pub item_id: String,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    #[serde(deserialize_with = "stored_int::quantity::deserialize")]
    #[ts(type = "number")]
    pub quantity: i64,

    /// Client clock at submission.
    #[serde(with = "iso8601")]
    #[ts(as = "String")]
    pub date: DateTime<Utc>,

    /// Actor display name, denormalized.
    #[serde(default)]
    pub user: String,

    /// Purchase order or requisition number.
    #[serde(default)]
    pub reference: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Transaction {
    /// Signed effect on the item's stock.
    pub fn delta(&self) -> i64 {
        match self.kind {
            TransactionType::In => self.quantity,
            TransactionType::Out => -self.quantity,
        }
    }
}

// =============================================================================
// Untrusted Inputs
// =============================================================================

/// A numeric form field as the UI submits it.
///
/// Forms post whatever the input element held: a number, a float, or text.
/// Coercion happens in [`crate::validation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        RawNumber::Int(value)
    }
}

impl From<i32> for RawNumber {
    fn from(value: i32) -> Self {
        RawNumber::Int(i64::from(value))
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

impl fmt::Display for RawNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNumber::Int(n) => write!(f, "{}", n),
            RawNumber::Float(n) => write!(f, "{}", n),
            RawNumber::Text(s) => f.write_str(s),
        }
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewItem {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    #[ts(type = "number | string | null")]
    pub stock: Option<RawNumber>,
    #[serde(default)]
    #[ts(type = "number | string | null")]
    pub reorder_level: Option<RawNumber>,
}

/// Partial edit of an item. There is deliberately no `stock` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    #[ts(type = "number | string | null")]
    pub reorder_level: Option<RawNumber>,
}

/// Input for a stock movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionInput {
    pub item_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[ts(type = "number | string")]
    pub quantity: RawNumber,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransactionInput {
    /// A receive (IN) from a supplier.
    pub fn receive(item_id: impl Into<String>, quantity: impl Into<RawNumber>) -> Self {
        Self::new(item_id, TransactionType::In, quantity)
    }

    /// An issue (OUT) to a department.
    pub fn issue(item_id: impl Into<String>, quantity: impl Into<RawNumber>) -> Self {
        Self::new(item_id, TransactionType::Out, quantity)
    }

    fn new(item_id: impl Into<String>, kind: TransactionType, quantity: impl Into<RawNumber>) -> Self {
        TransactionInput {
            item_id: item_id.into(),
            kind,
            quantity: quantity.into(),
            reference: String::new(),
            supplier: None,
            department: None,
            notes: None,
        }
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// =============================================================================
// Validated Drafts
// =============================================================================

/// A validated item awaiting a storage id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub name: String,
    pub sku: String,
    pub category: String,
    pub unit: String,
    pub stock: i64,
    pub reorder_level: i64,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
}

impl ItemDraft {
    pub fn into_item(self, id: impl Into<String>) -> Item {
        Item {
            id: id.into(),
            name: self.name,
            sku: self.sku,
            category: self.category,
            unit: self.unit,
            stock: self.stock,
            reorder_level: self.reorder_level,
            created_at: Some(self.created_at),
        }
    }
}

/// Validated item edits.
///
/// Serializes only the fields present, so the serialized key set doubles as
/// the update field mask.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reorder_level: Option<i64>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.category.is_none()
            && self.unit.is_none()
            && self.reorder_level.is_none()
    }

    /// Merges the changes into a cached item.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(sku) = &self.sku {
            item.sku = sku.clone();
        }
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
        if let Some(unit) = &self.unit {
            item.unit = unit.clone();
        }
        if let Some(level) = self.reorder_level {
            item.reorder_level = level;
        }
    }
}

/// A validated ledger entry awaiting its id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub item_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub quantity: i64,
    #[serde(with = "iso8601")]
    pub date: DateTime<Utc>,
    pub user: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TransactionDraft {
    pub fn into_transaction(self, id: impl Into<String>) -> Transaction {
        Transaction {
            id: id.into(),
            item_id: self.item_id,
            kind: self.kind,
            quantity: self.quantity,
            date: self.date,
            user: self.user,
            reference: self.reference,
            supplier: self.supplier,
            department: self.department,
            notes: self.notes,
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The currently signed-in user, as seen by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Actor {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub is_authenticated: bool,
}

impl Actor {
    pub fn authenticated(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Actor {
            id: Some(id.into()),
            display_name: Some(display_name.into()),
            is_authenticated: true,
        }
    }

    pub fn anonymous() -> Self {
        Actor::default()
    }

    /// Name stamped on transactions.
    pub fn display_name_or_unknown(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_ACTOR)
            .to_string()
    }
}

// =============================================================================
// Serde Helpers
// =============================================================================

/// ISO-8601 timestamps, written as `2024-05-01T09:30:00.000Z`.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value.trim()).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    /// Optional variant. Unparseable values read as `None`.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&super::format(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            Ok(raw.and_then(|s| super::parse(&s).ok()))
        }
    }
}

/// Reads integers that may have been stored as whole floats or numeric
/// strings. Anything else fails the whole record, which `parse_all` then skips.
mod stored_int {
    use super::*;
    use serde::de::Error;

    fn read<E: Error>(value: serde_json::Value) -> Result<i64, E> {
        match &value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .filter(|f| f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                })
                .ok_or_else(|| E::custom(format!("not a whole number: {}", value))),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| E::custom(format!("not a whole number: {:?}", s))),
            other => Err(E::custom(format!("not a number: {}", other))),
        }
    }

    /// Counts: zero or more.
    pub mod count {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
            let n = read(serde_json::Value::deserialize(deserializer)?)?;
            if n < 0 {
                return Err(D::Error::custom(format!("negative count: {}", n)));
            }
            Ok(n)
        }
    }

    /// Movement quantities: one or more.
    pub mod quantity {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
            let n = read(serde_json::Value::deserialize(deserializer)?)?;
            if n <= 0 {
                return Err(D::Error::custom(format!("quantity must be positive: {}", n)));
            }
            Ok(n)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_wire_shape() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": "T1",
            "itemId": "I1",
            "type": "IN",
            "quantity": 5,
            "date": "2024-05-01T09:30:00.000Z",
            "user": "Ada",
            "reference": "PO-7",
            "supplier": "Acme"
        }))
        .unwrap();

        assert_eq!(tx.kind, TransactionType::In);
        assert_eq!(tx.delta(), 5);
        assert_eq!(tx.department, None);

        let back = serde_json::to_value(&tx).unwrap();
        assert_eq!(back["type"], "IN");
        assert_eq!(back["itemId"], "I1");
        assert_eq!(back["date"], "2024-05-01T09:30:00.000Z");
        assert!(back.get("department").is_none());
    }

    #[test]
    fn test_item_reads_legacy_numbers() {
        let item: Item = serde_json::from_value(json!({
            "id": "I1",
            "name": "Claw Hammer 16oz",
            "sku": "TLS-HAM-16",
            "stock": "5",
            "reorderLevel": 10.0
        }))
        .unwrap();

        assert_eq!(item.stock, 5);
        assert_eq!(item.reorder_level, 10);
        assert_eq!(item.created_at, None);
        assert_eq!(item.category, "");
    }

    #[test]
    fn test_stored_numbers_are_validated() {
        let item = |stock: serde_json::Value, reorder: serde_json::Value| {
            serde_json::from_value::<Item>(json!({
                "id": "I1",
                "name": "Vest",
                "sku": "SAF-VST-O",
                "stock": stock,
                "reorderLevel": reorder
            }))
        };
        assert!(item(json!(-5), json!(2)).is_err());
        assert!(item(json!(5), json!("abc")).is_err());
        assert!(item(json!(2.5), json!(2)).is_err());
        assert!(item(json!(null), json!(2)).is_err());
        assert_eq!(item(json!(0), json!(0)).unwrap().stock, 0);

        let tx = |quantity: serde_json::Value| {
            serde_json::from_value::<Transaction>(json!({
                "id": "T1",
                "itemId": "I1",
                "type": "OUT",
                "quantity": quantity,
                "date": "2024-05-01T09:30:00.000Z"
            }))
        };
        assert!(tx(json!("garbage")).is_err());
        assert!(tx(json!(0)).is_err());
        assert!(tx(json!(-3)).is_err());
        assert_eq!(tx(json!("4")).unwrap().quantity, 4);
    }

    #[test]
    fn test_item_changes_only_serialize_present_fields() {
        let changes = ItemChanges {
            name: Some("Hammer".into()),
            reorder_level: Some(4),
            ..Default::default()
        };
        let value = serde_json::to_value(&changes).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name".to_string(), "reorderLevel".to_string()]);
    }

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!("in".parse::<TransactionType>().unwrap(), TransactionType::In);
        assert_eq!(" OUT ".parse::<TransactionType>().unwrap(), TransactionType::Out);
        assert!("sideways".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_actor_display_name_fallback() {
        assert_eq!(Actor::anonymous().display_name_or_unknown(), "Unknown");
        assert_eq!(
            Actor::authenticated("u1", "  ").display_name_or_unknown(),
            "Unknown"
        );
        assert_eq!(
            Actor::authenticated("u1", "Grace").display_name_or_unknown(),
            "Grace"
        );
    }

    #[test]
    fn test_raw_number_untagged() {
        let n: RawNumber = serde_json::from_value(json!(5)).unwrap();
        assert_eq!(n, RawNumber::Int(5));
        let n: RawNumber = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(n, RawNumber::Text("7".into()));
    }
}
