//! # Correspondence Records
//!
//! Incoming and outgoing letters tracked by the records unit. Attachments
//! are uploaded elsewhere; a letter only keeps the resulting reference.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::iso8601;
use crate::validation::{validate_optional, validate_required, ValidationResult};
use crate::{MAX_NAME_LEN, UNKNOWN_ACTOR};

/// Known filing classifications.
pub const LETTER_CLASSIFICATIONS: [&str; 9] = [
    "Chief Executive",
    "Finance",
    "Human Resources",
    "Operations",
    "Engineering",
    "Legal",
    "Procurement",
    "General",
    "Confidential",
];

/// Workflow statuses. New letters start as the first one.
pub const LETTER_STATUSES: [&str; 5] = ["Pending", "Acknowledged", "Forwarded", "Filed", "Responded"];

pub const PENDING: &str = "Pending";

const MAX_NOTES_LEN: usize = 2000;

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LetterType {
    Incoming,
    Outgoing,
}

/// A tracked letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Letter {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LetterType,
    pub subject: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub reference_no: String,
    /// Date written on the letter, as entered.
    #[serde(default)]
    pub letter_date: String,
    #[serde(default)]
    pub classification: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default, with = "iso8601::option")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Reference to an uploaded scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Attachment {
    pub file_url: String,
    pub file_name: String,
    pub storage_path: String,
}

/// Form input for a new letter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewLetter {
    #[serde(rename = "type")]
    pub kind: LetterType,
    pub subject: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub reference_no: String,
    #[serde(default)]
    pub letter_date: String,
    pub classification: String,
    #[serde(default)]
    pub notes: String,
}

/// Partial letter edit. Serialized keys form the update mask.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LetterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LetterPatch {
    pub fn status(status: impl Into<String>) -> Self {
        LetterPatch {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == LetterPatch::default()
    }

    pub fn apply_to(&self, letter: &mut Letter) {
        let fields = [
            (&self.subject, &mut letter.subject),
            (&self.sender, &mut letter.sender),
            (&self.recipient, &mut letter.recipient),
            (&self.reference_no, &mut letter.reference_no),
            (&self.letter_date, &mut letter.letter_date),
            (&self.classification, &mut letter.classification),
            (&self.status, &mut letter.status),
            (&self.notes, &mut letter.notes),
        ];
        for (change, target) in fields {
            if let Some(value) = change {
                *target = value.clone();
            }
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

fn check_allowed(field: &str, value: &str, allowed: &[&str]) -> ValidationResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// Builds the stored letter (without id) for a new submission.
pub fn validate_new_letter(
    input: &NewLetter,
    attachment: Option<Attachment>,
    created_by: Option<&str>,
    now: DateTime<Utc>,
) -> ValidationResult<Letter> {
    let subject = validate_required("subject", &input.subject, MAX_NAME_LEN)?;
    let classification = input.classification.trim().to_string();
    check_allowed("classification", &classification, &LETTER_CLASSIFICATIONS)?;
    let attachment = attachment.unwrap_or_default();

    Ok(Letter {
        id: String::new(),
        kind: input.kind,
        subject,
        sender: validate_optional("sender", &input.sender, MAX_NAME_LEN)?,
        recipient: validate_optional("recipient", &input.recipient, MAX_NAME_LEN)?,
        reference_no: validate_optional("referenceNo", &input.reference_no, MAX_NAME_LEN)?,
        letter_date: input.letter_date.trim().to_string(),
        classification,
        status: PENDING.to_string(),
        file_url: attachment.file_url,
        file_name: attachment.file_name,
        storage_path: attachment.storage_path,
        notes: validate_optional("notes", &input.notes, MAX_NOTES_LEN)?,
        created_by: created_by
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_ACTOR)
            .to_string(),
        created_at: Some(now),
    })
}

/// Checks a letter patch.
pub fn validate_letter_patch(patch: &LetterPatch) -> ValidationResult<()> {
    if patch.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }
    if let Some(subject) = &patch.subject {
        validate_required("subject", subject, MAX_NAME_LEN)?;
    }
    if let Some(classification) = &patch.classification {
        check_allowed("classification", classification, &LETTER_CLASSIFICATIONS)?;
    }
    if let Some(status) = &patch.status {
        check_allowed("status", status, &LETTER_STATUSES)?;
    }
    Ok(())
}

// =============================================================================
// Queries
// =============================================================================

/// Newest first; letters without a timestamp sink to the end.
pub fn sort_newest_first(letters: &mut [Letter]) {
    letters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Records dashboard filter. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct LetterFilter {
    pub query: String,
    pub kind: Option<LetterType>,
    pub classification: Option<String>,
    pub status: Option<String>,
}

impl LetterFilter {
    pub fn matches(&self, letter: &Letter) -> bool {
        let needle = self.query.trim().to_lowercase();
        let text_match = needle.is_empty()
            || [
                &letter.subject,
                &letter.sender,
                &letter.recipient,
                &letter.reference_no,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));

        text_match
            && self.kind.map_or(true, |k| letter.kind == k)
            && self
                .classification
                .as_deref()
                .map_or(true, |c| letter.classification == c)
            && self.status.as_deref().map_or(true, |s| letter.status == s)
    }

    pub fn apply<'a>(&self, letters: &'a [Letter]) -> Vec<&'a Letter> {
        letters.iter().filter(|l| self.matches(l)).collect()
    }
}

/// Records unit KPIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecordsSummary {
    pub total: usize,
    pub incoming_today: usize,
    pub outgoing_today: usize,
    pub pending: usize,
}

impl RecordsSummary {
    pub fn build(letters: &[Letter], today: NaiveDate) -> Self {
        let logged_today = |kind: LetterType| {
            letters
                .iter()
                .filter(|l| l.kind == kind)
                .filter(|l| l.created_at.map(|at| at.date_naive()) == Some(today))
                .count()
        };

        RecordsSummary {
            total: letters.len(),
            incoming_today: logged_today(LetterType::Incoming),
            outgoing_today: logged_today(LetterType::Outgoing),
            pending: letters.iter().filter(|l| l.status == PENDING).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn new_letter(kind: LetterType, subject: &str) -> NewLetter {
        NewLetter {
            kind,
            subject: subject.into(),
            sender: "Ministry of Works".into(),
            recipient: String::new(),
            reference_no: "MW/22/104".into(),
            letter_date: "2024-05-01".into(),
            classification: "Procurement".into(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_new_letter_defaults() {
        let now = Utc::now();
        let letter = validate_new_letter(
            &new_letter(LetterType::Incoming, "Tender notice"),
            None,
            None,
            now,
        )
        .unwrap();

        assert_eq!(letter.status, "Pending");
        assert_eq!(letter.created_by, "Unknown");
        assert_eq!(letter.file_url, "");
        assert_eq!(letter.created_at, Some(now));
    }

    #[test]
    fn test_new_letter_rejects_unknown_classification() {
        let mut input = new_letter(LetterType::Outgoing, "Reply");
        input.classification = "Gossip".into();
        let err = validate_new_letter(&input, None, Some("Ada"), Utc::now()).unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));

        let mut input = new_letter(LetterType::Outgoing, "  ");
        input.classification = "General".into();
        assert!(validate_new_letter(&input, None, Some("Ada"), Utc::now()).is_err());
    }

    #[test]
    fn test_patch_validation() {
        assert!(validate_letter_patch(&LetterPatch::status("Filed")).is_ok());
        assert!(validate_letter_patch(&LetterPatch::status("Lost")).is_err());
        assert!(validate_letter_patch(&LetterPatch::default()).is_err());
    }

    #[test]
    fn test_summary_and_filter() {
        let today = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();
        let mut letters = vec![
            validate_new_letter(&new_letter(LetterType::Incoming, "A"), None, None, today).unwrap(),
            validate_new_letter(
                &new_letter(LetterType::Outgoing, "B"),
                None,
                None,
                today - Duration::days(1),
            )
            .unwrap(),
            validate_new_letter(&new_letter(LetterType::Outgoing, "C"), None, None, today).unwrap(),
        ];
        LetterPatch::status("Filed").apply_to(&mut letters[2]);

        let summary = RecordsSummary::build(&letters, today.date_naive());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.incoming_today, 1);
        assert_eq!(summary.outgoing_today, 1);
        assert_eq!(summary.pending, 2);

        let filter = LetterFilter {
            query: "mw/22".into(),
            kind: Some(LetterType::Outgoing),
            ..Default::default()
        };
        assert_eq!(filter.apply(&letters).len(), 2);

        sort_newest_first(&mut letters);
        assert_eq!(letters[2].subject, "B");
    }
}
