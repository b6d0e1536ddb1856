pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod retainer;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod storage;
pub mod webhook;

pub use analytics::DashboardSummary;
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, IntakeError, Result, StorageError};
pub use model::{
    BodilyInjuryOption, CaseFields, ExtractedPayload, Intake, IntakePatch, IntakeStatus,
    PipelineTab,
};
pub use retainer::RetainerEmail;
pub use secrets::{resolve_secret, SecretError, SecretRef};
pub use service::{IntakeService, Upload};
pub use storage::DocumentStorage;
pub use webhook::{Outbox, OutboxDispatcher, WebhookClient, WebhookTargets};
