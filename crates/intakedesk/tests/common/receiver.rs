//! A throwaway webhook endpoint bound to `127.0.0.1:0`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use intakedesk::WebhookTargets;

#[derive(Clone)]
struct ReceiverState {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    status: Arc<AtomicU16>,
}

/// Records every POST to `/{kind}` and answers with a configurable status.
pub struct WebhookReceiver {
    pub base_url: String,
    state: ReceiverState,
}

impl WebhookReceiver {
    pub async fn start() -> Self {
        let state = ReceiverState {
            calls: Arc::new(Mutex::new(Vec::new())),
            status: Arc::new(AtomicU16::new(200)),
        };

        let app = Router::new()
            .route("/{kind}", post(record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind receiver");
        let addr = listener.local_addr().expect("No local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("receiver crashed");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Targets pointing both webhook kinds at this receiver.
    pub fn targets(&self) -> WebhookTargets {
        WebhookTargets::new(
            Some(&format!("{}/extract", self.base_url)),
            Some(&format!("{}/sync", self.base_url)),
        )
    }

    pub fn respond_with(&self, status: StatusCode) {
        self.state.status.store(status.as_u16(), Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.calls.lock().expect("poisoned").clone()
    }

    /// Waits until at least `count` calls have arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, Value)> {
        for _ in 0..100 {
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} webhook calls, got {}", count, self.calls().len());
    }
}

async fn record(
    State(state): State<ReceiverState>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.calls.lock().expect("poisoned").push((kind, body));
    StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}
