//! Shared state handed to every request handler.

use std::sync::Arc;
use std::time::Duration;

use intakedesk::config::DashboardConfig;
use intakedesk::{Intake, IntakeService};
use secrecy::SecretString;

/// Bearer token guarding the pipeline callback routes.
#[derive(Clone, Default)]
pub struct CallbackAuth {
    /// `None` leaves the callbacks open.
    pub token: Option<Arc<SecretString>>,
}

impl CallbackAuth {
    pub fn new(token: Option<SecretString>) -> Self {
        Self {
            token: token.map(Arc::new),
        }
    }
}

impl std::fmt::Debug for CallbackAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackAuth")
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// How often clients should refresh while a record is still being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub dashboard: Duration,
    pub review: Duration,
}

impl PollIntervals {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            dashboard: Duration::from_secs(config.poll_interval_secs),
            review: Duration::from_secs(config.review_poll_interval_secs),
        }
    }

    /// Interval for a listing, if any record in it is still in flight.
    pub fn for_list(&self, intakes: &[Intake]) -> Option<Duration> {
        intakes
            .iter()
            .any(|i| i.status.is_transient())
            .then_some(self.dashboard)
    }

    /// Interval for a single record view.
    pub fn for_record(&self, intake: &Intake) -> Option<Duration> {
        intake.status.is_transient().then_some(self.review)
    }
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: IntakeService,
    pub auth: CallbackAuth,
    pub polling: PollIntervals,
}
