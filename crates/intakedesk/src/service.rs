//! Intake operations: persistence, lifecycle rules and outbox writes tied
//! together.
//!
//! Every transition runs in one SQLite transaction that reads the record,
//! applies the rule from [`crate::lifecycle`], writes it back and queues any
//! webhook notification. Either all of that commits or none of it does.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::analytics::DashboardSummary;
use crate::config::RetainerConfig;
use crate::db::{self, intake_repo, Database};
use crate::error::{IntakeError, Result};
use crate::lifecycle;
use crate::model::{ExtractedPayload, Intake, IntakePatch, PipelineTab};
use crate::retainer::{self, RetainerEmail};
use crate::storage::DocumentStorage;
use crate::webhook::{NotificationKind, Outbox};

/// What a transition did to the record.
enum Effect {
    Unchanged,
    Changed,
    Notify(NotificationKind, Value),
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Accepts `application/pdf` or a filename that maps to it.
    pub fn is_pdf(&self) -> bool {
        let declared = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false);
        declared || mime_guess::from_path(&self.filename).first_raw() == Some("application/pdf")
    }
}

#[derive(Clone)]
pub struct IntakeService {
    db: Database,
    storage: DocumentStorage,
    outbox: Outbox,
    retainer: RetainerConfig,
    max_upload_bytes: usize,
}

impl IntakeService {
    pub fn new(
        db: Database,
        storage: DocumentStorage,
        outbox: Outbox,
        retainer: RetainerConfig,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            db,
            storage,
            outbox,
            retainer,
            max_upload_bytes,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// All intakes on a pipeline tab, newest first.
    pub fn list(&self, tab: PipelineTab) -> Result<Vec<Intake>> {
        let mut intakes = intake_repo::list_all(&self.db)?;
        intakes.retain(|i| tab.includes(i.status));
        Ok(intakes)
    }

    pub fn get(&self, id: &str) -> Result<Intake> {
        intake_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| IntakeError::NotFound(id.to_string()))
    }

    /// Creates a record, stores its document and requests extraction.
    ///
    /// If the document cannot be stored the new record is deleted again.
    pub fn upload(&self, upload: Upload) -> Result<Intake> {
        if upload.bytes.is_empty() {
            return Err(IntakeError::Validation("uploaded file is empty".to_string()));
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(IntakeError::PayloadTooLarge {
                limit: self.max_upload_bytes,
            });
        }
        if !upload.is_pdf() {
            return Err(IntakeError::Validation(format!(
                "'{}' is not a PDF",
                upload.filename
            )));
        }

        let now = db::now();
        let intake = Intake::new_upload(now);
        intake_repo::insert(&self.db, &intake)?;
        info!(intake_id = %intake.id, bytes = upload.bytes.len(), "intake created");

        let stored = match self
            .storage
            .put(&intake.id, &upload.filename, &upload.bytes, now)
        {
            Ok(stored) => stored,
            Err(e) => {
                error!(intake_id = %intake.id, "document storage failed: {}", e);
                self.rollback_upload(&intake.id, None);
                return Err(e.into());
            }
        };

        let result = self.transition(&intake.id, |intake, now| {
            lifecycle::store_document(intake, stored.url.clone(), now)?;
            Ok(Effect::Notify(
                NotificationKind::ExtractionRequest,
                lifecycle::extraction_request_payload(intake)?,
            ))
        });

        match result {
            Ok(intake) => {
                info!(intake_id = %intake.id, key = %stored.key, "document stored; extraction requested");
                Ok(intake)
            }
            Err(e) => {
                self.rollback_upload(&intake.id, Some(&stored.key));
                Err(e)
            }
        }
    }

    fn rollback_upload(&self, id: &str, key: Option<&str>) {
        if let Some(key) = key {
            if let Err(e) = self.storage.remove(key) {
                warn!(intake_id = id, "failed to remove orphaned document: {}", e);
            }
        }
        match intake_repo::delete(&self.db, id) {
            Ok(_) => info!(intake_id = id, "upload rolled back"),
            Err(e) => error!(intake_id = id, "failed to roll back upload: {}", e),
        }
    }

    /// Extraction pipeline callback.
    pub fn apply_extraction(&self, payload: ExtractedPayload) -> Result<Intake> {
        let (id, fields) = payload
            .into_parts()
            .ok_or_else(|| IntakeError::Validation("intake_id is required".to_string()))?;

        let intake = self.transition(&id, |intake, now| {
            lifecycle::apply_extraction(intake, fields, now)?;
            Ok(Effect::Changed)
        })?;
        info!(intake_id = %intake.id, status = %intake.status, "extraction applied");
        Ok(intake)
    }

    /// Manual edit from the review surface.
    pub fn update(&self, id: &str, patch: IntakePatch) -> Result<Intake> {
        self.transition(id, |intake, now| {
            lifecycle::apply_edit(intake, patch, now)?;
            Ok(Effect::Changed)
        })
    }

    pub fn approve(&self, id: &str) -> Result<Intake> {
        let intake = self.transition(id, |intake, now| {
            lifecycle::approve(intake, now)?;
            Ok(Effect::Notify(
                NotificationKind::CaseSync,
                lifecycle::case_sync_payload(intake)?,
            ))
        })?;
        info!(intake_id = %intake.id, "intake approved");
        Ok(intake)
    }

    pub fn reject(&self, id: &str) -> Result<Intake> {
        let intake = self.transition(id, |intake, now| {
            lifecycle::reject(intake, now)?;
            Ok(Effect::Changed)
        })?;
        info!(intake_id = %intake.id, "intake rejected");
        Ok(intake)
    }

    pub fn reextract(&self, id: &str) -> Result<Intake> {
        let intake = self.transition(id, |intake, now| {
            lifecycle::reextract(intake, now)?;
            Ok(Effect::Notify(
                NotificationKind::ExtractionRequest,
                lifecycle::extraction_request_payload(intake)?,
            ))
        })?;
        info!(intake_id = %intake.id, "re-extraction requested");
        Ok(intake)
    }

    /// Case-sync callback. Already-sent records are left as they are.
    pub fn mark_sent(&self, id: &str) -> Result<Intake> {
        self.transition(id, |intake, now| {
            if lifecycle::mark_sent(intake, now)? {
                info!(intake_id = %intake.id, "intake marked sent");
                Ok(Effect::Changed)
            } else {
                Ok(Effect::Unchanged)
            }
        })
    }

    pub fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardSummary> {
        let intakes = intake_repo::list_all(&self.db)?;
        Ok(DashboardSummary::compute(&intakes, now))
    }

    pub fn email_preview(&self, id: &str, now: DateTime<Utc>) -> Result<RetainerEmail> {
        let intake = self.get(id)?;
        Ok(retainer::render(&intake, &self.retainer, now))
    }

    /// Loads, mutates and persists one record atomically, queueing the
    /// transition's notification in the same transaction.
    fn transition<F>(&self, id: &str, apply: F) -> Result<Intake>
    where
        F: FnOnce(&mut Intake, DateTime<Utc>) -> Result<Effect>,
    {
        let now = db::now();
        let (intake, queued) = self.db.transaction(|tx| {
            let mut intake = intake_repo::find_in(tx, id)?
                .ok_or_else(|| IntakeError::NotFound(id.to_string()))?;

            let queued = match apply(&mut intake, now)? {
                Effect::Unchanged => false,
                Effect::Changed => {
                    intake_repo::update_in(tx, &intake)?;
                    false
                }
                Effect::Notify(kind, payload) => {
                    intake_repo::update_in(tx, &intake)?;
                    self.outbox.enqueue_in(tx, &intake.id, kind, &payload, now)?
                }
            };
            Ok::<_, IntakeError>((intake, queued))
        })?;

        if queued {
            self.outbox.wake();
        }
        Ok(intake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::outbox_repo;
    use crate::model::IntakeStatus;
    use crate::webhook::WebhookTargets;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> IntakeService {
        IntakeService::new(
            Database::open_in_memory().unwrap(),
            DocumentStorage::new(dir.path(), "http://localhost:8080/documents"),
            Outbox::new(WebhookTargets::new(
                Some("http://127.0.0.1:9/extract"),
                Some("http://127.0.0.1:9/sync"),
            )),
            RetainerConfig::default(),
            1024,
        )
    }

    fn pdf(bytes: &[u8]) -> Upload {
        Upload {
            filename: "report.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_upload_moves_to_extracting_and_queues_request() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let intake = svc.upload(pdf(b"%PDF-1.4")).unwrap();
        assert_eq!(intake.status, IntakeStatus::Extracting);
        let url = intake.pdf_url.clone().unwrap();
        assert!(url.starts_with(&format!("http://localhost:8080/documents/{}/", intake.id)));

        let queued = outbox_repo::list_for_intake(svc.database(), &intake.id).unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind, NotificationKind::ExtractionRequest);
        assert_eq!(queued[0].payload["document_url"], url.as_str());
    }

    #[test]
    fn test_upload_validation() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        assert!(matches!(svc.upload(pdf(b"")), Err(IntakeError::Validation(_))));
        assert!(matches!(
            svc.upload(pdf(&[0u8; 2048])),
            Err(IntakeError::PayloadTooLarge { limit: 1024 })
        ));
        let text = Upload {
            filename: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: b"hello".to_vec(),
        };
        assert!(matches!(svc.upload(text), Err(IntakeError::Validation(_))));
        assert!(svc.list(PipelineTab::All).unwrap().is_empty());
    }

    #[test]
    fn test_is_pdf_by_extension_or_type() {
        let mut upload = pdf(b"x");
        upload.content_type = None;
        assert!(upload.is_pdf());
        upload.filename = "scan.bin".to_string();
        upload.content_type = Some("application/pdf; charset=binary".to_string());
        assert!(upload.is_pdf());
        upload.content_type = Some("application/octet-stream".to_string());
        assert!(!upload.is_pdf());
    }

    #[test]
    fn test_storage_failure_rolls_back_record() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("blocked");
        std::fs::write(&root, b"").unwrap();
        let svc = IntakeService::new(
            Database::open_in_memory().unwrap(),
            DocumentStorage::new(&root, "http://x"),
            Outbox::new(WebhookTargets::default()),
            RetainerConfig::default(),
            1024,
        );

        assert!(matches!(svc.upload(pdf(b"%PDF")), Err(IntakeError::Storage(_))));
        assert!(svc.list(PipelineTab::All).unwrap().is_empty());
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        for result in [svc.approve("nope"), svc.reject("nope"), svc.mark_sent("nope")] {
            assert!(matches!(result, Err(IntakeError::NotFound(_))));
        }
        assert!(matches!(svc.get("nope"), Err(IntakeError::NotFound(_))));
    }

    #[test]
    fn test_extraction_requires_intake_id() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        assert!(matches!(
            svc.apply_extraction(ExtractedPayload::default()),
            Err(IntakeError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_transition_leaves_no_notification() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let intake = svc.upload(pdf(b"%PDF")).unwrap();

        assert!(matches!(
            svc.approve(&intake.id),
            Err(IntakeError::InvalidTransition { .. })
        ));
        let queued = outbox_repo::list_for_intake(svc.database(), &intake.id).unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(svc.get(&intake.id).unwrap().status, IntakeStatus::Extracting);
    }
}
