//! Status lifecycle rules.
//!
//! Every function here is pure: it checks the precondition for one
//! transition against the current record and, if it holds, mutates the
//! record in place. Persistence and notifications are the caller's job
//! (see [`crate::service`]). On error the record is left untouched.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{IntakeError, Result};
use crate::model::{CaseFields, Intake, IntakePatch, IntakeStatus};

/// A transition a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StoreDocument,
    ApplyExtraction,
    Approve,
    Reject,
    Reextract,
    MarkSent,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::StoreDocument => "store document for",
            Action::ApplyExtraction => "apply extraction to",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Reextract => "re-extract",
            Action::MarkSent => "mark sent",
        }
    }

    /// Statuses the action may start from.
    pub fn allowed_from(&self) -> &'static [IntakeStatus] {
        use IntakeStatus::*;
        match self {
            Action::StoreDocument => &[Uploading],
            Action::ApplyExtraction => &[Extracting, Review, Flagged],
            Action::Approve => &[Review, Flagged],
            Action::Reject => &[Extracting, Review, Flagged],
            Action::Reextract => &[Extracting, Review, Flagged, Approved],
            Action::MarkSent => &[Approved, Sent],
        }
    }
}

fn require(intake: &Intake, action: Action) -> Result<()> {
    if action.allowed_from().contains(&intake.status) {
        Ok(())
    } else {
        Err(IntakeError::InvalidTransition {
            id: intake.id.clone(),
            status: intake.status,
            action: action.as_str(),
        })
    }
}

/// Document persisted: `Uploading → Extracting`.
pub fn store_document(intake: &mut Intake, pdf_url: String, now: DateTime<Utc>) -> Result<()> {
    require(intake, Action::StoreDocument)?;
    intake.pdf_url = Some(pdf_url);
    intake.status = IntakeStatus::Extracting;
    intake.updated_at = now;
    Ok(())
}

/// Extraction callback: overwrites every extraction-derived field and lands
/// in `Flagged` or `Review` depending on `clio_flagged`.
pub fn apply_extraction(intake: &mut Intake, fields: CaseFields, now: DateTime<Utc>) -> Result<()> {
    require(intake, Action::ApplyExtraction)?;
    intake.status = if fields.clio_flagged {
        IntakeStatus::Flagged
    } else {
        IntakeStatus::Review
    };
    intake.case = fields;
    intake.extracted_at = Some(now);
    intake.updated_at = now;
    Ok(())
}

/// Manual edit from the review surface.
///
/// Locked records only accept notes. An empty patch is rejected.
pub fn apply_edit(intake: &mut Intake, patch: IntakePatch, now: DateTime<Utc>) -> Result<()> {
    if patch.is_empty() {
        return Err(IntakeError::Validation(
            "no editable fields supplied".to_string(),
        ));
    }
    if intake.status.is_locked() && patch.touches_case_fields() {
        return Err(IntakeError::Locked {
            id: intake.id.clone(),
            status: intake.status,
        });
    }
    patch.apply_to(intake);
    intake.updated_at = now;
    Ok(())
}

pub fn approve(intake: &mut Intake, now: DateTime<Utc>) -> Result<()> {
    require(intake, Action::Approve)?;
    intake.status = IntakeStatus::Approved;
    intake.approved_at = Some(now);
    intake.updated_at = now;
    Ok(())
}

pub fn reject(intake: &mut Intake, now: DateTime<Utc>) -> Result<()> {
    require(intake, Action::Reject)?;
    intake.status = IntakeStatus::Rejected;
    intake.updated_at = now;
    Ok(())
}

/// Sends the record back through extraction. Clears the extraction-derived
/// fields plus `extracted_at` and `approved_at`; keeps id, document and notes.
pub fn reextract(intake: &mut Intake, now: DateTime<Utc>) -> Result<()> {
    require(intake, Action::Reextract)?;
    if intake.pdf_url.is_none() {
        return Err(IntakeError::NoDocument(intake.id.clone()));
    }
    intake.status = IntakeStatus::Extracting;
    intake.case = CaseFields::default();
    intake.extracted_at = None;
    intake.approved_at = None;
    intake.updated_at = now;
    Ok(())
}

/// `Approved → Sent`. Returns `false` when the record was already sent, in
/// which case nothing changes.
pub fn mark_sent(intake: &mut Intake, now: DateTime<Utc>) -> Result<bool> {
    require(intake, Action::MarkSent)?;
    if intake.status == IntakeStatus::Sent {
        return Ok(false);
    }
    intake.status = IntakeStatus::Sent;
    intake.sent_at = Some(now);
    intake.updated_at = now;
    Ok(true)
}

/// Body POSTed to the extraction pipeline.
pub fn extraction_request_payload(intake: &Intake) -> Result<Value> {
    let document_url = intake
        .pdf_url
        .as_deref()
        .ok_or_else(|| IntakeError::NoDocument(intake.id.clone()))?;
    Ok(serde_json::json!({
        "document_url": document_url,
        "intake_id": intake.id,
    }))
}

/// Body POSTed to the case-management sync: the full record plus
/// `intake_id` and `approved_at`.
pub fn case_sync_payload(intake: &Intake) -> Result<Value> {
    let mut value = serde_json::to_value(intake)?;
    if let Value::Object(map) = &mut value {
        map.insert("intake_id".to_string(), Value::String(intake.id.clone()));
        map.insert("approved_at".to_string(), serde_json::to_value(intake.approved_at)?);
    }
    Ok(value)
}
