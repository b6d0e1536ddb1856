//! Test harness for isolated service execution.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use intakedesk::config::{OutboxConfig, RetainerConfig};
use intakedesk::webhook::{NotificationKind, WebhookClient, WebhookTargets};
use intakedesk::{
    Database, DocumentStorage, Intake, IntakeService, Outbox, OutboxDispatcher, Upload,
};

use super::builders::ExtractionBuilder;

pub const PUBLIC_BASE_URL: &str = "http://intake.test/documents";

/// A service wired to a temp-dir database and document store.
pub struct TestHarness {
    temp_dir: TempDir,
    pub documents_dir: PathBuf,
    pub db: Database,
    pub outbox: Outbox,
    pub service: IntakeService,
}

impl TestHarness {
    /// Harness with both webhooks pointing at an unroutable address. The
    /// outbox still queues; nothing is delivered unless a test dispatches.
    pub fn new() -> Self {
        Self::with_targets(WebhookTargets::new(
            Some("http://127.0.0.1:9/extract"),
            Some("http://127.0.0.1:9/sync"),
        ))
    }

    pub fn with_targets(targets: WebhookTargets) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let documents_dir = temp_dir.path().join("documents");
        let db = Database::open(&temp_dir.path().join("data").join("intakedesk.db"))
            .expect("Failed to open database");
        let outbox = Outbox::new(targets);
        let service = IntakeService::new(
            db.clone(),
            DocumentStorage::new(&documents_dir, PUBLIC_BASE_URL),
            outbox.clone(),
            RetainerConfig::default(),
            64 * 1024,
        );

        Self {
            temp_dir,
            documents_dir,
            db,
            outbox,
            service,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn dispatcher(&self, config: &OutboxConfig) -> OutboxDispatcher {
        let client =
            WebhookClient::new(std::time::Duration::from_secs(5)).expect("Failed to build client");
        OutboxDispatcher::new(self.db.clone(), self.outbox.clone(), client, config)
    }

    /// Uploads a small PDF and returns the record (status Extracting).
    pub fn upload_pdf(&self, filename: &str) -> Intake {
        self.service
            .upload(Upload {
                filename: filename.to_string(),
                content_type: Some("application/pdf".to_string()),
                bytes: b"%PDF-1.7\n%test\n".to_vec(),
            })
            .expect("upload failed")
    }

    /// Upload followed by an extraction callback.
    pub fn extracted_intake(&self, flagged: bool) -> Intake {
        let intake = self.upload_pdf("report.pdf");
        self.service
            .apply_extraction(ExtractionBuilder::new(&intake.id).flagged(flagged).build())
            .expect("extraction failed")
    }

    pub fn queued(&self, intake_id: &str) -> Vec<intakedesk::webhook::Notification> {
        intakedesk::db::outbox_repo::list_for_intake(&self.db, intake_id)
            .expect("Failed to list notifications")
    }

    pub fn queued_kinds(&self, intake_id: &str) -> Vec<NotificationKind> {
        self.queued(intake_id).into_iter().map(|n| n.kind).collect()
    }
}
