//! # Activity Log
//!
//! Fire-and-forget audit trail of who did what.
//!
//! ```text
//! store operation ──► ActivityLogger::log ──► queue ──► writer task ──► dyn ActivitySink
//!                                                          │                │
//!                                                          │  Err(e)        ├─ CollectionActivitySink (audit_log)
//!                                                          ▼                └─ NoOpActivitySink
//!                                                     warn!, swallowed
//! ```
//!
//! A failed or slow log write never fails, delays or rolls back the
//! operation that caused it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use stores_core::types::iso8601;
use stores_core::Actor;
use stores_sync::{parse_all, to_fields, AccessResult, Collection, DataAccess};

// =============================================================================
// Entries
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    ItemCreated,
    ItemUpdated,
    ItemDeleted,
    StockIn,
    StockOut,
    LetterCreated,
    LetterUpdated,
    LetterDeleted,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityAction::ItemCreated => "item_created",
            ActivityAction::ItemUpdated => "item_updated",
            ActivityAction::ItemDeleted => "item_deleted",
            ActivityAction::StockIn => "stock_in",
            ActivityAction::StockOut => "stock_out",
            ActivityAction::LetterCreated => "letter_created",
            ActivityAction::LetterUpdated => "letter_updated",
            ActivityAction::LetterDeleted => "letter_deleted",
        };
        f.write_str(name)
    }
}

/// One line in the `audit_log` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub action: ActivityAction,
    pub details: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(action: ActivityAction, details: impl Into<String>, actor: &Actor) -> Self {
        ActivityEntry {
            id: String::new(),
            action,
            details: details.into(),
            user_id: actor.id.clone(),
            user_name: actor.display_name_or_unknown(),
            target_id: None,
            target_type: None,
            timestamp: Utc::now(),
        }
    }

    pub fn target(mut self, target_type: &str, target_id: impl Into<String>) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = Some(target_id.into());
        self
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Where activity entries go.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, entry: &ActivityEntry) -> AccessResult<()>;
}

/// Appends entries to the `audit_log` collection.
pub struct CollectionActivitySink {
    access: Arc<dyn DataAccess>,
}

impl CollectionActivitySink {
    pub fn new(access: Arc<dyn DataAccess>) -> Self {
        CollectionActivitySink { access }
    }
}

#[async_trait]
impl ActivitySink for CollectionActivitySink {
    async fn record(&self, entry: &ActivityEntry) -> AccessResult<()> {
        let fields = to_fields(entry)?;
        self.access.create(Collection::AuditLog, fields).await?;
        Ok(())
    }
}

/// Discards entries.
pub struct NoOpActivitySink;

#[async_trait]
impl ActivitySink for NoOpActivitySink {
    async fn record(&self, _entry: &ActivityEntry) -> AccessResult<()> {
        Ok(())
    }
}

// =============================================================================
// Logger
// =============================================================================

enum LogCommand {
    Entry(ActivityEntry),
    Flush(oneshot::Sender<()>),
}

/// Queues entries for a background writer and swallows sink failures.
///
/// `log` never waits on the sink, so a slow audit backend cannot hold up
/// the operation being logged.
#[derive(Clone)]
pub struct ActivityLogger {
    queue: Option<mpsc::UnboundedSender<LogCommand>>,
}

impl ActivityLogger {
    /// Starts the writer task. Must be called inside a Tokio runtime.
    pub fn new(sink: Arc<dyn ActivitySink>) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(sink, rx));
        ActivityLogger { queue: Some(queue) }
    }

    pub fn disabled() -> Self {
        ActivityLogger { queue: None }
    }

    /// Queues an entry. Never fails and never blocks.
    pub fn log(&self, entry: ActivityEntry) {
        let Some(queue) = &self.queue else { return };
        if let Err(e) = queue.send(LogCommand::Entry(entry)) {
            if let LogCommand::Entry(entry) = e.0 {
                warn!(action = %entry.action, "Activity writer stopped, entry dropped");
            }
        }
    }

    /// Waits until every entry queued so far has been handed to the sink.
    pub async fn flush(&self) {
        let Some(queue) = &self.queue else { return };
        let (done, wait) = oneshot::channel();
        if queue.send(LogCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn run_writer(sink: Arc<dyn ActivitySink>, mut rx: mpsc::UnboundedReceiver<LogCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            LogCommand::Entry(entry) => {
                if let Err(e) = sink.record(&entry).await {
                    warn!(
                        action = %entry.action,
                        target = ?entry.target_id,
                        error = %e,
                        "Activity log write failed"
                    );
                }
            }
            LogCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Activity writer stopped");
}

/// The most recent entries, newest first.
pub async fn recent_activity(access: &dyn DataAccess, limit: usize) -> AccessResult<Vec<ActivityEntry>> {
    let docs = access.list(Collection::AuditLog).await?;
    let mut entries: Vec<ActivityEntry> = parse_all(Collection::AuditLog, &docs);
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries.truncate(limit);
    Ok(entries)
}
