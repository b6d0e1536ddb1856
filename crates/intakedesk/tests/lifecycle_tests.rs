//! End-to-end lifecycle tests against a real on-disk database.

mod common;

use chrono::Utc;
use serde_json::json;

use common::{ExtractionBuilder, TestHarness};
use intakedesk::webhook::NotificationKind;
use intakedesk::{BodilyInjuryOption, IntakeError, IntakePatch, IntakeStatus, PipelineTab};

fn patch(value: serde_json::Value) -> IntakePatch {
    serde_json::from_value(value).expect("invalid patch")
}

#[test]
fn test_upload_stores_document_under_intake_id() {
    let harness = TestHarness::new();
    let intake = harness.upload_pdf("Police Report #42.pdf");

    assert_eq!(intake.status, IntakeStatus::Extracting);
    let url = intake.pdf_url.as_deref().unwrap();
    let key = url
        .strip_prefix(&format!("{}/", common::harness::PUBLIC_BASE_URL))
        .unwrap();
    assert!(key.starts_with(&format!("{}/", intake.id)));
    assert!(key.ends_with("-Police_Report__42.pdf"));
    assert!(harness.documents_dir.join(key).exists());
    assert_eq!(
        harness.queued_kinds(&intake.id),
        vec![NotificationKind::ExtractionRequest]
    );
}

#[test]
fn test_extraction_callback_sets_review_or_flagged() {
    let harness = TestHarness::new();

    let review = harness.extracted_intake(false);
    assert_eq!(review.status, IntakeStatus::Review);
    assert!(review.extracted_at.is_some());
    assert_eq!(review.case.client_name.as_deref(), Some("Maria Lopez"));
    assert_eq!(
        review.case.use_bodily_injury_paragraph,
        Some(BodilyInjuryOption::Yes)
    );

    let flagged = harness.extracted_intake(true);
    assert_eq!(flagged.status, IntakeStatus::Flagged);
}

#[test]
fn test_extraction_callback_defaults_missing_flags() {
    let harness = TestHarness::new();
    let intake = harness.upload_pdf("r.pdf");
    let payload = ExtractionBuilder::new(&intake.id)
        .remove("injury_flag")
        .remove("clio_flagged")
        .build();

    let updated = harness.service.apply_extraction(payload).unwrap();
    assert_eq!(updated.status, IntakeStatus::Review);
    assert!(!updated.case.injury_flag);
    assert!(!updated.case.clio_flagged);
}

#[test]
fn test_extraction_for_unknown_intake_is_not_found() {
    let harness = TestHarness::new();
    let payload = ExtractionBuilder::new("00000000-0000-0000-0000-000000000000").build();
    assert!(matches!(
        harness.service.apply_extraction(payload),
        Err(IntakeError::NotFound(_))
    ));
}

#[test]
fn test_approve_then_edits_are_locked() {
    let harness = TestHarness::new();
    let intake = harness.extracted_intake(false);

    let approved = harness.service.approve(&intake.id).unwrap();
    assert_eq!(approved.status, IntakeStatus::Approved);
    assert!(approved.approved_at.is_some());

    let err = harness
        .service
        .update(&intake.id, patch(json!({"client_name": "Someone Else"})))
        .unwrap_err();
    assert!(matches!(err, IntakeError::Locked { .. }));

    let noted = harness
        .service
        .update(&intake.id, patch(json!({"notes": "client called back"})))
        .unwrap();
    assert_eq!(noted.notes.as_deref(), Some("client called back"));
    assert_eq!(noted.case, approved.case);

    let stored = harness.service.get(&intake.id).unwrap();
    assert_eq!(stored.case.client_name.as_deref(), Some("Maria Lopez"));
}

#[test]
fn test_approve_queues_case_sync_with_full_record() {
    let harness = TestHarness::new();
    let intake = harness.extracted_intake(true);
    let approved = harness.service.approve(&intake.id).unwrap();

    let queued = harness.queued(&intake.id);
    assert_eq!(queued.len(), 2);
    let sync = &queued[1];
    assert_eq!(sync.kind, NotificationKind::CaseSync);
    assert_eq!(sync.payload["intake_id"], intake.id.as_str());
    assert_eq!(sync.payload["status"], "Approved");
    assert_eq!(sync.payload["defendant_name"], "Harold Greer");
    assert_eq!(
        sync.payload["approved_at"],
        serde_json::to_value(approved.approved_at).unwrap()
    );
}

#[test]
fn test_returned_record_and_payload_match_stored_row() {
    let harness = TestHarness::new();
    let intake = harness.extracted_intake(false);

    let approved = harness.service.approve(&intake.id).unwrap();
    let stored = harness.service.get(&intake.id).unwrap();
    assert_eq!(approved, stored);

    let sync = &harness.queued(&intake.id)[1];
    assert_eq!(
        sync.payload["approved_at"],
        serde_json::to_value(stored.approved_at).unwrap()
    );

    let sent = harness.service.mark_sent(&intake.id).unwrap();
    assert_eq!(sent, harness.service.get(&intake.id).unwrap());
}

#[test]
fn test_reextract_approved_clears_derived_fields() {
    let harness = TestHarness::new();
    let intake = harness.extracted_intake(false);
    harness
        .service
        .update(&intake.id, patch(json!({"notes": "keep me"})))
        .unwrap();
    harness.service.approve(&intake.id).unwrap();

    let reextracted = harness.service.reextract(&intake.id).unwrap();
    assert_eq!(reextracted.status, IntakeStatus::Extracting);
    assert_eq!(reextracted.approved_at, None);
    assert_eq!(reextracted.extracted_at, None);
    assert_eq!(reextracted.case.clio_matter_id, None);
    assert_eq!(reextracted.case.client_name, None);
    assert!(!reextracted.case.injury_flag);
    assert_eq!(reextracted.notes.as_deref(), Some("keep me"));
    assert_eq!(reextracted.pdf_url, intake.pdf_url);

    assert_eq!(
        harness.queued_kinds(&intake.id),
        vec![
            NotificationKind::ExtractionRequest,
            NotificationKind::CaseSync,
            NotificationKind::ExtractionRequest,
        ]
    );
}

#[test]
fn test_mark_sent_sets_timestamp_once() {
    let harness = TestHarness::new();
    let intake = harness.extracted_intake(false);
    harness.service.approve(&intake.id).unwrap();

    let sent = harness.service.mark_sent(&intake.id).unwrap();
    assert_eq!(sent.status, IntakeStatus::Sent);
    let first_sent_at = sent.sent_at.unwrap();

    let again = harness.service.mark_sent(&intake.id).unwrap();
    assert_eq!(again.sent_at, Some(first_sent_at));
    assert_eq!(harness.service.get(&intake.id).unwrap().sent_at, Some(first_sent_at));
}

#[test]
fn test_mark_sent_before_approval_is_invalid() {
    let harness = TestHarness::new();
    let intake = harness.extracted_intake(false);
    assert!(matches!(
        harness.service.mark_sent(&intake.id),
        Err(IntakeError::InvalidTransition { .. })
    ));
}

#[test]
fn test_rejected_is_absorbing() {
    let harness = TestHarness::new();
    let intake = harness.extracted_intake(false);
    let rejected = harness.service.reject(&intake.id).unwrap();
    assert_eq!(rejected.status, IntakeStatus::Rejected);

    for result in [
        harness.service.approve(&intake.id),
        harness.service.reextract(&intake.id),
        harness.service.reject(&intake.id),
    ] {
        assert!(matches!(result, Err(IntakeError::InvalidTransition { .. })));
    }
    let late = ExtractionBuilder::new(&intake.id).build();
    assert!(harness.service.apply_extraction(late).is_err());
}

#[test]
fn test_list_tabs_and_order() {
    let harness = TestHarness::new();
    let pause = || std::thread::sleep(std::time::Duration::from_millis(5));
    let first = harness.extracted_intake(false);
    pause();
    let second = harness.extracted_intake(true);
    pause();
    let third = harness.extracted_intake(false);
    harness.service.approve(&third.id).unwrap();

    let all: Vec<String> = harness
        .service
        .list(PipelineTab::All)
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(all.len(), 3);
    assert_eq!(all.last(), Some(&first.id));

    let review: Vec<String> = harness
        .service
        .list(PipelineTab::Review)
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(review.len(), 2);
    assert!(review.contains(&second.id));

    assert_eq!(harness.service.list(PipelineTab::Approved).unwrap().len(), 1);
    assert!(harness.service.list(PipelineTab::Sent).unwrap().is_empty());
}

#[test]
fn test_dashboard_reflects_lifecycle() {
    let harness = TestHarness::new();
    let a = harness.extracted_intake(false);
    harness.extracted_intake(true);
    harness.upload_pdf("pending.pdf");
    harness.service.approve(&a.id).unwrap();
    harness.service.mark_sent(&a.id).unwrap();

    let summary = harness.service.dashboard(Utc::now()).unwrap();
    let counts: Vec<usize> = summary.funnel.iter().map(|s| s.count).collect();
    assert_eq!(counts, vec![3, 2, 1, 1]);
    assert_eq!(summary.intakes_this_month, 3);
    assert_eq!(summary.time_saved.sent_this_month, 1);
    assert_eq!(summary.time_saved.display, "45m");
    assert_eq!(summary.injury_split.bodily_injury, 2);
    assert_eq!(summary.needs_attention, 2);
    assert_ne!(summary.speed_to_lead, "—");
}

#[test]
fn test_email_preview_uses_extracted_fields() {
    let harness = TestHarness::new();
    let intake = harness.extracted_intake(false);
    let email = harness.service.email_preview(&intake.id, Utc::now()).unwrap();

    assert_eq!(email.greeting, "Hello Maria,");
    assert_eq!(email.attachment_name, "Maria Lopez [Retainer Agreement].pdf");
    assert!(email.includes_bodily_injury);
    assert!(email.paragraphs[0].contains("Mar 5, 2026"));
}
