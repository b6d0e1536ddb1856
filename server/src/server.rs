//! Startup wiring: builds every component from the config once and serves
//! until shutdown.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use intakedesk::webhook::NotificationKind;
use intakedesk::{
    Config, ConfigError, Database, DocumentStorage, IntakeService, Outbox, OutboxDispatcher,
    WebhookClient, WebhookTargets,
};

use crate::error::ServerError;
use crate::routes::router;
use crate::state::{AppState, CallbackAuth, PollIntervals};

/// Everything `run` needs, constructed up front so startup errors surface
/// before the listener is bound.
pub struct App {
    pub state: AppState,
    pub dispatcher: OutboxDispatcher,
    pub documents_dir: PathBuf,
}

impl App {
    pub fn build(config: &Config) -> Result<Self, ServerError> {
        let db_path = config.database_path().ok_or(ServerError::NoDatabasePath)?;
        let db = Database::open(&db_path)?;
        info!(path = %db_path.display(), "database ready");

        let documents_dir = config.storage_directory();
        std::fs::create_dir_all(&documents_dir).map_err(|source| {
            ServerError::StorageDirectory {
                path: documents_dir.clone(),
                source,
            }
        })?;
        let storage = DocumentStorage::new(&documents_dir, &config.public_base_url());

        let targets = WebhookTargets::from_config(&config.webhooks)?;
        for kind in [NotificationKind::ExtractionRequest, NotificationKind::CaseSync] {
            if !targets.is_configured(kind) {
                warn!(kind = %kind, "no webhook target configured; these notifications are skipped");
            }
        }
        let outbox = Outbox::new(targets);
        let client = WebhookClient::new(Duration::from_secs(config.webhooks.timeout_secs))?;

        let callback_token = match &config.server.callback_token {
            Some(secret) => Some(secret.resolve().map_err(|source| ConfigError::Secret {
                name: "callback_token",
                source,
            })?),
            None => None,
        };
        if callback_token.is_none() {
            warn!("server.callback_token is not set; pipeline callbacks are unauthenticated");
        }

        let service = IntakeService::new(
            db.clone(),
            storage,
            outbox.clone(),
            config.retainer.clone(),
            config.storage.max_upload_bytes,
        );
        let dispatcher = OutboxDispatcher::new(db, outbox, client, &config.outbox);

        Ok(Self {
            state: AppState {
                service,
                auth: CallbackAuth::new(callback_token),
                polling: PollIntervals::from_config(&config.dashboard),
            },
            dispatcher,
            documents_dir,
        })
    }
}

/// Serves HTTP and runs the outbox dispatcher until `cancel` fires.
pub async fn run(config: &Config, app: App, cancel: CancellationToken) -> Result<(), ServerError> {
    let App {
        state,
        dispatcher,
        documents_dir,
    } = app;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("intake desk listening on {addr}");

    let dispatcher_task = tokio::spawn(dispatcher.run(cancel.clone()));

    let shutdown = cancel.clone();
    let result = axum::serve(listener, router(state, &documents_dir))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    // Stop the dispatcher too if the server exited on its own.
    cancel.cancel();
    if let Err(e) = dispatcher_task.await {
        warn!("outbox dispatcher ended abnormally: {}", e);
    }
    info!("intake desk stopped");

    result.map_err(ServerError::Serve)
}
