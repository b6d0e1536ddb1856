//! Shared test utilities for intakedesk integration tests.
//!
//! This module provides:
//! - `TestHarness` for an isolated service with its own database and document root
//! - Builders for extraction payloads and configs
//! - `WebhookReceiver`, a throwaway HTTP endpoint that records deliveries

pub mod builders;
pub mod harness;
pub mod receiver;

pub use builders::*;
pub use harness::TestHarness;
pub use receiver::WebhookReceiver;
