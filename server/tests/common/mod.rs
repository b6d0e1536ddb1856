//! In-process router harness for API tests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use intakedesk::config::{DashboardConfig, RetainerConfig};
use intakedesk::{Database, DocumentStorage, IntakeService, Outbox, WebhookTargets};
use intakedesk_server::{router, AppState, CallbackAuth, PollIntervals};

pub const PUBLIC_HOST: &str = "http://intake.test";
pub const BOUNDARY: &str = "intakedesk-test-boundary";

pub struct TestApp {
    _temp_dir: TempDir,
    pub db: Database,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(None, 1024)
    }

    pub fn with_callback_token(token: &str) -> Self {
        Self::build(Some(token), 1024)
    }

    fn build(token: Option<&str>, max_upload_bytes: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let documents_dir = temp_dir.path().join("documents");
        let db = Database::open_in_memory().expect("Failed to open database");
        let outbox = Outbox::new(WebhookTargets::new(
            Some("http://127.0.0.1:9/extract"),
            Some("http://127.0.0.1:9/sync"),
        ));
        let service = IntakeService::new(
            db.clone(),
            DocumentStorage::new(&documents_dir, &format!("{}/documents", PUBLIC_HOST)),
            outbox,
            RetainerConfig::default(),
            max_upload_bytes,
        );
        let state = AppState {
            service,
            auth: CallbackAuth::new(token.map(|t| SecretString::from(t.to_string()))),
            polling: PollIntervals::from_config(&DashboardConfig::default()),
        };

        Self {
            router: router(state, &documents_dir),
            db,
            _temp_dir: temp_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(&self, method: Method, uri: &str, body: &Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn upload(&self, filename: &str, content_type: &str, bytes: &[u8]) -> Response<Body> {
        self.send(multipart_request("pdf", filename, content_type, bytes))
            .await
    }

    /// Uploads a PDF and returns its intake id.
    pub async fn upload_pdf(&self) -> String {
        let response = self
            .upload("report.pdf", "application/pdf", b"%PDF-1.7\n%test\n")
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        body["intake_id"].as_str().unwrap().to_string()
    }

    /// Upload followed by an extraction callback.
    pub async fn extracted(&self, flagged: bool) -> String {
        let id = self.upload_pdf().await;
        let response = self
            .send_json(Method::POST, "/api/intakes/extracted", &extraction(&id, flagged))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        id
    }
}

pub fn multipart_request(
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/intakes")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn extraction(intake_id: &str, flagged: bool) -> Value {
    serde_json::json!({
        "intake_id": intake_id,
        "clio_matter_id": "M-2041",
        "clio_flagged": flagged,
        "client_name": "Maria Lopez",
        "date_of_accident": "2026-03-05",
        "defendant_name": "Harold Greer",
        "number_of_injured": 1,
        "injury_flag": true,
        "use_bodily_injury_paragraph": "Yes",
        "accident_description": "you were rear-ended while stopped at a red light.",
    })
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn json_body(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}
