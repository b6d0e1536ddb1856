//! Builders for callback payloads and configs.

#![allow(dead_code)]

use serde_json::{json, Map, Value};

use intakedesk::config::{Config, OutboxConfig};
use intakedesk::ExtractedPayload;

/// Builds an extraction callback body the way the pipeline sends it.
pub struct ExtractionBuilder {
    fields: Map<String, Value>,
}

impl ExtractionBuilder {
    /// A typical, unflagged extraction result.
    pub fn new(intake_id: &str) -> Self {
        let value = json!({
            "intake_id": intake_id,
            "clio_matter_id": "M-2041",
            "client_name": "Maria Lopez",
            "client_gender": "Female",
            "date_of_accident": "2026-03-05",
            "accident_location": "Main St & 3rd Ave",
            "defendant_name": "Harold Greer",
            "client_plate_number": "7ABC123",
            "number_of_injured": 1,
            "injury_flag": true,
            "use_bodily_injury_paragraph": "Yes",
            "accident_description": "you were rear-ended while stopped at a red light.",
            "statute_of_limitations_date": "2028-03-05",
        });
        Self {
            fields: value.as_object().cloned().expect("payload is an object"),
        }
    }

    pub fn flagged(self, flagged: bool) -> Self {
        self.set("clio_flagged", json!(flagged))
    }

    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    pub fn json(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn build(self) -> ExtractedPayload {
        serde_json::from_value(self.json()).expect("Invalid extraction payload")
    }
}

/// Outbox settings with short, test-friendly backoff.
pub fn fast_outbox(max_attempts: u32) -> OutboxConfig {
    OutboxConfig {
        max_attempts,
        base_backoff_secs: 1,
        max_backoff_secs: 4,
        poll_interval_secs: 1,
        batch_size: 10,
    }
}

/// A config with the given overrides serialized the way a user would write it.
pub fn config_json(overrides: Value) -> String {
    let mut base = json!({ "version": "1.0" });
    if let (Value::Object(base_map), Value::Object(extra)) = (&mut base, overrides) {
        base_map.extend(extra);
    }
    serde_json::to_string_pretty(&base).expect("Failed to serialize config")
}

pub fn default_config() -> Config {
    Config::default()
}
