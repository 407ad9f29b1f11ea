//! # Seed Data
//!
//! Populates an empty database with the department's starter catalog.
//!
//! ## Usage
//! ```bash
//! cargo run -p stores-db --bin seed
//! cargo run -p stores-db --bin seed -- --db ./data/stores.db
//! ```
//!
//! Each collection is only seeded when it is empty, so re-running is safe.

use serde::Serialize;
use std::env;
use stores_core::{Category, Item};
use stores_db::{Database, DbConfig, JsonMap};
use uuid::Uuid;

const CATEGORIES: &[(&str, &str)] = &[
    ("C1", "Office Supplies"),
    ("C2", "Hardware & Tools"),
    ("C3", "Electronics"),
    ("C4", "Safety Gear"),
];

/// (name, sku, category, unit, stock, reorder level)
const ITEMS: &[(&str, &str, &str, &str, i64, i64)] = &[
    ("A4 Printer Paper (500 sheets)", "PPR-A4", "Office Supplies", "Ream", 45, 50),
    ("Safety Helmets (Yellow)", "SAF-HLM-Y", "Safety Gear", "Pcs", 12, 15),
    ("Heavy Duty Measuring Tape 5m", "TLS-TAP-5M", "Hardware & Tools", "Pcs", 8, 10),
    ("Extension Cord 10m", "ELE-EXT-10M", "Electronics", "Pcs", 25, 10),
    ("High-Visibility Vests", "SAF-VST-O", "Safety Gear", "Pcs", 100, 50),
    ("Claw Hammer 16oz", "TLS-HAM-16", "Hardware & Tools", "Pcs", 5, 10),
];

/// Serializes a record and strips its id (ids live in the key, not the body).
fn to_body<T: Serialize>(record: &T) -> Result<JsonMap, Box<dyn std::error::Error>> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(format!("expected an object, got {}", other).into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./stores_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stores Ledger Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stores_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stores Ledger Seed Data");
    println!("==========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let docs = db.documents();

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if docs.count("items").await? == 0 {
        for (name, sku, category, unit, stock, reorder_level) in ITEMS {
            let item = Item {
                id: String::new(),
                name: name.to_string(),
                sku: sku.to_string(),
                category: category.to_string(),
                unit: unit.to_string(),
                stock: *stock,
                reorder_level: *reorder_level,
                created_at: None,
            };
            docs.insert("items", &Uuid::new_v4().to_string(), &to_body(&item)?)
                .await?;
        }
        println!("✓ Seeded {} items", ITEMS.len());
    } else {
        println!("⚠ Items already present, skipping");
    }

    if docs.count("categories").await? == 0 {
        for (id, name) in CATEGORIES {
            let category = Category {
                id: id.to_string(),
                name: name.to_string(),
            };
            docs.upsert("categories", id, &to_body(&category)?).await?;
        }
        println!("✓ Seeded {} categories", CATEGORIES.len());
    } else {
        println!("⚠ Categories already present, skipping");
    }

    db.close().await;
    println!();
    println!("Done.");
    Ok(())
}
