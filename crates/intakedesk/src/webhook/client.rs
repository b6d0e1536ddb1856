//! Outbound HTTP client for webhook notifications.

use std::time::Duration;

use super::error::{Result, WebhookError};

/// Thin wrapper over a shared `reqwest::Client` with a fixed timeout.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("intakedesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(WebhookError::ClientBuild)?;
        Ok(Self { http })
    }

    /// POSTs `payload` as JSON. Any 2xx response counts as delivered.
    pub async fn post_json(&self, url: &str, payload: &serde_json::Value) -> Result<()> {
        let response = self.http.post(url).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(WebhookError::Status {
                status: status.as_u16(),
            })
        }
    }
}
