//! # Reports
//!
//! Read-only views over the cached catalog and ledger: stock classification,
//! alert lists, dashboard and audit rollups, search, and reconciliation.

use serde::Serialize;
use ts_rs::TS;

use crate::ledger::ledger_balance;
use crate::types::{Item, Transaction, TransactionType};
use crate::RECENT_TRANSACTIONS_LIMIT;

// =============================================================================
// Stock Status
// =============================================================================

/// Alert classification of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    /// Classifies a stock level against its reorder threshold.
    ///
    /// | stock                   | status     |
    /// |-------------------------|------------|
    /// | 0                       | OutOfStock |
    /// | 1..=reorder_level       | LowStock   |
    /// | above reorder_level     | InStock    |
    pub fn classify(stock: i64, reorder_level: i64) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn of(item: &Item) -> Self {
        Self::classify(item.stock, item.reorder_level)
    }

    pub const fn label(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::InStock => "In Stock",
        }
    }
}

// =============================================================================
// Alerts
// =============================================================================

/// Items needing attention, split by severity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockAlerts {
    pub out_of_stock: Vec<Item>,
    pub low_stock: Vec<Item>,
}

impl StockAlerts {
    pub fn from_items(items: &[Item]) -> Self {
        let mut alerts = StockAlerts::default();
        for item in items {
            match StockStatus::of(item) {
                StockStatus::OutOfStock => alerts.out_of_stock.push(item.clone()),
                StockStatus::LowStock => alerts.low_stock.push(item.clone()),
                StockStatus::InStock => {}
            }
        }
        alerts
    }

    pub fn is_empty(&self) -> bool {
        self.out_of_stock.is_empty() && self.low_stock.is_empty()
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Storekeeper dashboard KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardSummary {
    pub unique_items: usize,
    #[ts(type = "number")]
    pub total_stock: i64,
    /// Items at or below their reorder level, out-of-stock included.
    pub low_stock_count: usize,
    pub recent_transactions: Vec<Transaction>,
}

impl DashboardSummary {
    /// Builds the summary. `transactions` must already be newest first.
    pub fn build(items: &[Item], transactions: &[Transaction]) -> Self {
        DashboardSummary {
            unique_items: items.len(),
            total_stock: saturating_total(items.iter().map(|i| i.stock)),
            low_stock_count: items
                .iter()
                .filter(|i| i.stock <= i.reorder_level)
                .count(),
            recent_transactions: transactions
                .iter()
                .take(RECENT_TRANSACTIONS_LIMIT)
                .cloned()
                .collect(),
        }
    }
}

/// Sum that pins at `i64::MAX` instead of wrapping.
fn saturating_total(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0, i64::saturating_add)
}

// =============================================================================
// Audit Rollup
// =============================================================================

/// Read-only totals for the audit unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuditSummary {
    pub unique_items: usize,
    #[ts(type = "number")]
    pub total_received: i64,
    #[ts(type = "number")]
    pub total_issued: i64,
    #[ts(type = "number")]
    pub total_stock: i64,
}

impl AuditSummary {
    pub fn build(items: &[Item], transactions: &[Transaction]) -> Self {
        let sum_of = |kind: TransactionType| {
            saturating_total(
                transactions
                    .iter()
                    .filter(|tx| tx.kind == kind)
                    .map(|tx| tx.quantity),
            )
        };

        AuditSummary {
            unique_items: items.len(),
            total_received: sum_of(TransactionType::In),
            total_issued: sum_of(TransactionType::Out),
            total_stock: saturating_total(items.iter().map(|i| i.stock)),
        }
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Case-insensitive match on name or SKU, optionally within one category.
pub fn search_items<'a>(items: &'a [Item], query: &str, category: Option<&str>) -> Vec<&'a Item> {
    let needle = query.trim().to_lowercase();
    items
        .iter()
        .filter(|item| category.map_or(true, |c| c.is_empty() || item.category == c))
        .filter(|item| {
            needle.is_empty()
                || item.name.to_lowercase().contains(&needle)
                || item.sku.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Display label for a transaction's item.
///
/// Falls back to the stored id when the item has since been deleted.
pub fn item_label<'a>(items: &'a [Item], item_id: &'a str) -> &'a str {
    items
        .iter()
        .find(|i| i.id == item_id)
        .map(|i| i.name.as_str())
        .unwrap_or(item_id)
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Stored stock compared with the ledger-derived balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub item_id: String,
    pub stored_stock: i64,
    pub ledger_stock: i64,
}

impl Reconciliation {
    /// Stored minus derived. Positive means the ledger is missing receipts
    /// or has extra issues.
    pub fn drift(&self) -> i64 {
        self.stored_stock.saturating_sub(self.ledger_stock)
    }

    pub fn is_consistent(&self) -> bool {
        self.drift() == 0
    }
}

/// Replays the ledger for one item from its initial stock.
pub fn reconcile(item: &Item, transactions: &[Transaction], initial_stock: i64) -> Reconciliation {
    Reconciliation {
        item_id: item.id.clone(),
        stored_stock: item.stock,
        ledger_stock: ledger_balance(&item.id, initial_stock, transactions),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn item(id: &str, name: &str, sku: &str, category: &str, stock: i64, reorder: i64) -> Item {
        Item {
            id: id.into(),
            name: name.into(),
            sku: sku.into(),
            category: category.into(),
            unit: "Pcs".into(),
            stock,
            reorder_level: reorder,
            created_at: None,
        }
    }

    fn tx(n: i64, item_id: &str, kind: TransactionType, quantity: i64) -> Transaction {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        Transaction {
            id: format!("T{}", n),
            item_id: item_id.into(),
            kind,
            quantity,
            date: base + Duration::minutes(n),
            user: "Ada".into(),
            reference: String::new(),
            supplier: None,
            department: None,
            notes: None,
        }
    }

    fn catalog() -> Vec<Item> {
        vec![
            item("1", "A4 Printer Paper (500 sheets)", "PPR-A4", "Office Supplies", 45, 50),
            item("2", "Safety Helmets (Yellow)", "SAF-HLM-Y", "Safety Gear", 0, 15),
            item("3", "Extension Cord 10m", "ELE-EXT-10M", "Electronics", 25, 10),
        ]
    }

    #[test]
    fn test_classify() {
        assert_eq!(StockStatus::classify(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(0, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(1, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(6, 5), StockStatus::InStock);

        assert_eq!(StockStatus::OutOfStock.label(), "Out of Stock");
        assert_eq!(StockStatus::LowStock.label(), "Low Stock");
        assert_eq!(StockStatus::InStock.label(), "In Stock");
    }

    #[test]
    fn test_alerts() {
        let alerts = StockAlerts::from_items(&catalog());
        assert_eq!(alerts.out_of_stock.len(), 1);
        assert_eq!(alerts.out_of_stock[0].sku, "SAF-HLM-Y");
        assert_eq!(alerts.low_stock.len(), 1);
        assert_eq!(alerts.low_stock[0].sku, "PPR-A4");
        assert!(!alerts.is_empty());
    }

    #[test]
    fn test_dashboard_counts_out_of_stock_as_low() {
        let txs: Vec<_> = (0..12)
            .rev()
            .map(|n| tx(n, "3", TransactionType::In, 1))
            .collect();
        let summary = DashboardSummary::build(&catalog(), &txs);

        assert_eq!(summary.unique_items, 3);
        assert_eq!(summary.total_stock, 70);
        assert_eq!(summary.low_stock_count, 2);
        assert_eq!(summary.recent_transactions.len(), 10);
        assert_eq!(summary.recent_transactions[0].id, "T11");
    }

    #[test]
    fn test_audit_summary() {
        let txs = vec![
            tx(1, "1", TransactionType::In, 10),
            tx(2, "1", TransactionType::Out, 4),
            tx(3, "3", TransactionType::In, 5),
        ];
        let summary = AuditSummary::build(&catalog(), &txs);
        assert_eq!(summary.total_received, 15);
        assert_eq!(summary.total_issued, 4);
        assert_eq!(summary.total_stock, 70);
    }

    #[test]
    fn test_totals_saturate_on_huge_stock() {
        let huge = i64::MAX / 2 + 1;
        let items = vec![
            item("1", "Bolts", "HW-BLT-01", "Hardware", huge, 0),
            item("2", "Nuts", "HW-NUT-01", "Hardware", huge, 0),
        ];
        let txs = vec![
            tx(1, "1", TransactionType::In, huge),
            tx(2, "2", TransactionType::In, huge),
        ];

        assert_eq!(DashboardSummary::build(&items, &txs).total_stock, i64::MAX);
        let audit = AuditSummary::build(&items, &txs);
        assert_eq!(audit.total_stock, i64::MAX);
        assert_eq!(audit.total_received, i64::MAX);
        assert_eq!(ledger_balance("1", huge, &txs), i64::MAX);

        let drift = reconcile(&items[0], &[], i64::MIN + 1).drift();
        assert_eq!(drift, i64::MAX);
    }

    #[test]
    fn test_search_items() {
        let items = catalog();
        assert_eq!(search_items(&items, "paper", None).len(), 1);
        assert_eq!(search_items(&items, "saf-", None).len(), 1);
        assert_eq!(search_items(&items, "", Some("Electronics")).len(), 1);
        assert_eq!(search_items(&items, "cord", Some("Safety Gear")).len(), 0);
        assert_eq!(search_items(&items, "  ", Some("")).len(), 3);
    }

    #[test]
    fn test_item_label_falls_back_to_id() {
        let items = catalog();
        assert_eq!(item_label(&items, "3"), "Extension Cord 10m");
        assert_eq!(item_label(&items, "gone-42"), "gone-42");
    }

    #[test]
    fn test_reconcile_detects_missing_ledger_entry() {
        let items = catalog();
        let paper = &items[0];
        let txs = vec![tx(1, "1", TransactionType::In, 10), tx(2, "1", TransactionType::Out, 5)];

        let ok = reconcile(paper, &txs, 40);
        assert!(ok.is_consistent());

        let drifted = reconcile(paper, &txs[..1], 40);
        assert_eq!(drifted.ledger_stock, 50);
        assert_eq!(drifted.drift(), -5);
    }
}
