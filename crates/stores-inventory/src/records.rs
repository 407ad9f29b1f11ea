//! # Records Store
//!
//! Register of incoming and outgoing letters. Pull-based: the cache is empty
//! until the first [`RecordsStore::refresh`], and writes update it from their
//! own response. Clones share one cache.
//!
//! Scans are uploaded by the file-storage collaborator before a letter is
//! added; this store only keeps the resulting [`Attachment`] reference.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use stores_core::letters::{
    sort_newest_first, validate_letter_patch, validate_new_letter, Attachment, Letter,
    LetterFilter, LetterPatch, LetterType, NewLetter, RecordsSummary,
};
use stores_sync::{parse_all, to_fields, Collection, DataAccess, Document};

use crate::activity::{ActivityAction, ActivityEntry, ActivityLogger};
use crate::actor::ActorProvider;
use crate::error::{InventoryError, InventoryResult};

/// Cached letters register.
#[derive(Clone)]
pub struct RecordsStore {
    access: Arc<dyn DataAccess>,
    actor: Arc<dyn ActorProvider>,
    activity: ActivityLogger,
    letters: Arc<RwLock<Vec<Letter>>>,
}

impl RecordsStore {
    pub fn new(
        access: Arc<dyn DataAccess>,
        actor: Arc<dyn ActorProvider>,
        activity: ActivityLogger,
    ) -> Self {
        RecordsStore {
            access,
            actor,
            activity,
            letters: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Reloads the register.
    pub async fn refresh(&self) -> InventoryResult<()> {
        let docs = self.access.list(Collection::Letters).await?;
        let mut letters: Vec<Letter> = parse_all(Collection::Letters, &docs);
        sort_newest_first(&mut letters);
        *self.letters.write().await = letters;
        Ok(())
    }

    /// Newest first.
    pub async fn letters(&self) -> Vec<Letter> {
        self.letters.read().await.clone()
    }

    pub async fn search(&self, filter: &LetterFilter) -> Vec<Letter> {
        let letters = self.letters.read().await;
        filter.apply(&letters).into_iter().cloned().collect()
    }

    pub async fn summary(&self, today: NaiveDate) -> RecordsSummary {
        RecordsSummary::build(&self.letters.read().await, today)
    }

    /// Logs a new letter as Pending.
    #[instrument(skip(self, input, attachment), fields(subject = %input.subject))]
    pub async fn add_letter(
        &self,
        input: NewLetter,
        attachment: Option<Attachment>,
    ) -> InventoryResult<Letter> {
        let actor = self.actor.current_actor();
        let mut letter = validate_new_letter(
            &input,
            attachment,
            actor.display_name.as_deref(),
            Utc::now(),
        )?;

        let body = Document::from_record(&letter)?;
        let created = self.access.create(Collection::Letters, body.fields).await?;
        letter.id = created.id;

        {
            let mut letters = self.letters.write().await;
            letters.retain(|l| l.id != letter.id);
            letters.insert(0, letter.clone());
            sort_newest_first(&mut letters);
        }
        info!(letter_id = %letter.id, "Letter logged");

        self.log(
            ActivityAction::LetterCreated,
            format!("Logged {} letter: {}", kind_label(letter.kind), letter.subject),
            &letter.id,
        );
        Ok(letter)
    }

    /// Applies a partial edit, e.g. a status change.
    #[instrument(skip(self, patch))]
    pub async fn update_letter(&self, id: &str, patch: LetterPatch) -> InventoryResult<Letter> {
        validate_letter_patch(&patch)?;

        let fields = to_fields(&patch)?;
        self.access.update(Collection::Letters, id, fields).await?;

        let updated = {
            let mut letters = self.letters.write().await;
            match letters.iter_mut().find(|l| l.id == id) {
                Some(letter) => {
                    patch.apply_to(letter);
                    letter.clone()
                }
                None => {
                    drop(letters);
                    // Written but not cached yet: pick it up from storage.
                    self.refresh().await?;
                    self.letters
                        .read()
                        .await
                        .iter()
                        .find(|l| l.id == id)
                        .cloned()
                        .ok_or_else(|| InventoryError::NotFound {
                            collection: Collection::Letters.to_string(),
                            id: id.to_string(),
                        })?
                }
            }
        };

        let change = patch
            .status
            .as_deref()
            .map(|s| format!("status set to {}", s))
            .unwrap_or_else(|| "details edited".to_string());
        self.log(
            ActivityAction::LetterUpdated,
            format!("Letter {}: {}", updated.subject, change),
            id,
        );
        Ok(updated)
    }

    /// Removes a letter. Removing an absent letter succeeds.
    #[instrument(skip(self))]
    pub async fn delete_letter(&self, id: &str) -> InventoryResult<()> {
        self.access.remove(Collection::Letters, id).await?;

        let removed = {
            let mut letters = self.letters.write().await;
            let position = letters.iter().position(|l| l.id == id);
            position.map(|p| letters.remove(p))
        };

        let subject = removed.map(|l| l.subject).unwrap_or_else(|| id.to_string());
        self.log(
            ActivityAction::LetterDeleted,
            format!("Deleted letter {}", subject),
            id,
        );
        Ok(())
    }

    fn log(&self, action: ActivityAction, details: String, letter_id: &str) {
        let actor = self.actor.current_actor();
        self.activity
            .log(ActivityEntry::new(action, details, &actor).target("letter", letter_id));
    }
}

fn kind_label(kind: LetterType) -> &'static str {
    match kind {
        LetterType::Incoming => "incoming",
        LetterType::Outgoing => "outgoing",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stores_core::Actor;
    use stores_sync::{MemoryRestTransport, RestStrategy};

    use crate::actor::SessionActor;

    fn new_letter(kind: LetterType, subject: &str) -> NewLetter {
        NewLetter {
            kind,
            subject: subject.into(),
            sender: "Ministry of Works".into(),
            recipient: "Stores Department".into(),
            reference_no: "MW/22/104".into(),
            letter_date: "2024-05-01".into(),
            classification: "Procurement".into(),
            notes: String::new(),
        }
    }

    fn store() -> (Arc<MemoryRestTransport>, RecordsStore) {
        let transport = Arc::new(MemoryRestTransport::new());
        let access: Arc<dyn DataAccess> = Arc::new(RestStrategy::new(transport.clone()));
        let actor = Arc::new(SessionActor::new(Actor::authenticated("u7", "Registry Clerk")));
        (
            transport,
            RecordsStore::new(access, actor, ActivityLogger::disabled()),
        )
    }

    #[tokio::test]
    async fn test_add_update_delete() {
        let (transport, records) = store();

        let letter = records
            .add_letter(
                new_letter(LetterType::Incoming, "Quarterly supplies request"),
                Some(Attachment {
                    file_url: "https://files.example/scan.pdf".into(),
                    file_name: "scan.pdf".into(),
                    storage_path: "letters/scan.pdf".into(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(letter.status, "Pending");
        assert_eq!(letter.created_by, "Registry Clerk");
        let stored = transport.document(Collection::Letters, &letter.id).unwrap();
        assert_eq!(stored["fileName"], "scan.pdf");
        assert!(!stored.contains_key("id"));

        let updated = records
            .update_letter(&letter.id, LetterPatch::status("Filed"))
            .await
            .unwrap();
        assert_eq!(updated.status, "Filed");
        assert_eq!(updated.subject, "Quarterly supplies request");
        assert_eq!(
            transport.document(Collection::Letters, &letter.id).unwrap()["subject"],
            "Quarterly supplies request"
        );

        records.delete_letter(&letter.id).await.unwrap();
        records.delete_letter(&letter.id).await.unwrap();
        assert!(records.letters().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unknown_status_and_classification() {
        let (transport, records) = store();

        let mut input = new_letter(LetterType::Outgoing, "Reply");
        input.classification = "Gossip".into();
        assert!(matches!(
            records.add_letter(input, None).await,
            Err(InventoryError::Validation(_))
        ));

        let err = records
            .update_letter("L1", LetterPatch::status("Lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_of_missing_letter_is_not_found() {
        let (_transport, records) = store();
        let err = records
            .update_letter("ghost", LetterPatch::status("Filed"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Letter not found");
    }

    #[tokio::test]
    async fn test_refresh_search_and_summary() {
        let (_transport, records) = store();
        records
            .add_letter(new_letter(LetterType::Incoming, "Fuel allocation"), None)
            .await
            .unwrap();
        records
            .add_letter(new_letter(LetterType::Outgoing, "Tender notice"), None)
            .await
            .unwrap();

        records.refresh().await.unwrap();
        assert_eq!(records.letters().await.len(), 2);

        let found = records
            .search(&LetterFilter {
                query: "fuel".into(),
                ..Default::default()
            })
            .await;
        assert_eq!(found.len(), 1);

        let summary = records.summary(Utc::now().date_naive()).await;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.incoming_today, 1);
        assert_eq!(summary.outgoing_today, 1);
        assert_eq!(summary.pending, 2);
    }
}
