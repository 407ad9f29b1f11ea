//! # Stores Console
//!
//! Command-line front end for the stores ledger.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load `StoresConfig` (defaults, TOML file, environment)
//! 3. Connect the Inventory Store (probe real-time, fail over to REST)
//! 4. Run one command and print the result as JSON
//!
//! ## Usage
//! ```bash
//! stores status
//! stores items paper
//! stores receive <item-id> 5 "Acme Supplies"
//! stores issue <item-id> 2 IT
//! stores letters
//! stores activity 20
//! stores --config ./stores.toml status
//! ```
//!
//! The acting user comes from `STORES_USER` / `STORES_USER_ID`.

use chrono::Utc;
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stores_core::{Actor, TransactionInput};
use stores_inventory::{InventoryError, InventoryStore, SessionActor};
use stores_sync::StoresConfig;

const USAGE: &str = "usage: stores [--config PATH] <status | items [QUERY] | receive ITEM QTY [SUPPLIER] | issue ITEM QTY [DEPARTMENT] | letters | activity [N]>";

#[derive(Debug)]
enum Command {
    Status,
    Items(String),
    Receive {
        item_id: String,
        quantity: String,
        supplier: Option<String>,
    },
    Issue {
        item_id: String,
        quantity: String,
        department: Option<String>,
    },
    Letters,
    Activity(usize),
}

fn parse_args(args: &[String]) -> Result<(Option<PathBuf>, Command), String> {
    let mut config_path = None;
    let mut rest = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = args.get(i + 1).ok_or("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            other => rest.push(other.to_string()),
        }
        i += 1;
    }

    let mut words = rest.into_iter();
    let command = match words.next().as_deref() {
        None | Some("status") => Command::Status,
        Some("items") => Command::Items(words.collect::<Vec<_>>().join(" ")),
        Some("receive") => Command::Receive {
            item_id: words.next().ok_or(USAGE)?,
            quantity: words.next().ok_or(USAGE)?,
            supplier: words.next(),
        },
        Some("issue") => Command::Issue {
            item_id: words.next().ok_or(USAGE)?,
            quantity: words.next().ok_or(USAGE)?,
            department: words.next(),
        },
        Some("letters") => Command::Letters,
        Some("activity") => Command::Activity(
            words
                .next()
                .map(|n| n.parse().map_err(|_| format!("not a count: {}", n)))
                .transpose()?
                .unwrap_or(10),
        ),
        Some(other) => return Err(format!("unknown command '{}'\n{}", other, USAGE)),
    };

    Ok((config_path, command))
}

fn current_actor() -> Actor {
    match (env::var("STORES_USER_ID"), env::var("STORES_USER")) {
        (Ok(id), Ok(name)) => Actor::authenticated(id, name),
        (Err(_), Ok(name)) => Actor::authenticated(name.clone(), name),
        _ => Actor::anonymous(),
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stores=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print(value: serde_json::Value) {
    match serde_json::to_string_pretty(&value) {
        Ok(text) => println!("{}", text),
        Err(e) => error!(error = %e, "Could not render output"),
    }
}

async fn run(store: &InventoryStore, command: Command) -> Result<(), InventoryError> {
    match command {
        Command::Status => {
            print(json!({
                "access": store.access_state().to_string(),
                "failoverReason": store.failover_reason().map(|r| r.to_string()),
                "dashboard": store.dashboard().await,
                "alerts": store.alerts().await,
                "audit": store.audit_summary().await,
            }));
        }
        Command::Items(query) => {
            let items = store.search(&query, None).await;
            print(json!(items));
        }
        Command::Receive {
            item_id,
            quantity,
            supplier,
        } => {
            let mut input = TransactionInput::receive(item_id, quantity.as_str());
            if let Some(supplier) = supplier {
                input = input.with_supplier(supplier);
            }
            let transaction = store.record_transaction(input).await?;
            print(json!(transaction));
        }
        Command::Issue {
            item_id,
            quantity,
            department,
        } => {
            let mut input = TransactionInput::issue(item_id, quantity.as_str());
            if let Some(department) = department {
                input = input.with_department(department);
            }
            let transaction = store.record_transaction(input).await?;
            print(json!(transaction));
        }
        Command::Letters => {
            let records = store.records();
            records.refresh().await?;
            print(json!({
                "summary": records.summary(Utc::now().date_naive()).await,
                "letters": records.letters().await,
            }));
        }
        Command::Activity(limit) => {
            let entries = store.recent_activity(limit).await?;
            print(json!(entries));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let (config_path, command) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    let config = StoresConfig::load_or_default(config_path);
    info!(mode = %config.mode(), rest = %config.rest.base_url, "Starting stores console");

    let actor = Arc::new(SessionActor::new(current_actor()));
    let store = match InventoryStore::connect_with_config(&config, actor, 0).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Could not connect the inventory store");
            print(json!(e.to_payload()));
            return ExitCode::FAILURE;
        }
    };

    let result = run(&store, command).await;
    store.flush_activity().await;
    store.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print(json!(e.to_payload()));
            ExitCode::FAILURE
        }
    }
}
