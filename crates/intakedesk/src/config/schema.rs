use serde::{Deserialize, Serialize};

use crate::secrets::SecretRef;

pub const CONFIG_VERSION: &str = "1.0";

pub const EXTRACTION_WEBHOOK_ENV: &str = "EXTRACTION_WEBHOOK_URL";
pub const CASE_SYNC_WEBHOOK_ENV: &str = "CASE_SYNC_WEBHOOK_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub retainer: RetainerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            webhooks: WebhooksConfig::default(),
            outbox: OutboxConfig::default(),
            dashboard: DashboardConfig::default(),
            retainer: RetainerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required on the pipeline callback routes when set.
    pub callback_token: Option<SecretRef>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            callback_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Defaults to `~/.intakedesk/data/intakedesk.db`.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub directory: String,
    /// Base URL documents are served from. Derived from the server address
    /// when absent.
    pub public_base_url: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: "~/.intakedesk/documents".to_string(),
            public_base_url: None,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhooksConfig {
    pub extraction: SecretRef,
    pub case_sync: SecretRef,
    pub timeout_secs: u64,
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            extraction: SecretRef::from_env(EXTRACTION_WEBHOOK_ENV),
            case_sync: SecretRef::from_env(CASE_SYNC_WEBHOOK_ENV),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutboxConfig {
    pub max_attempts: u32,
    pub base_backoff_secs: u64,
    pub max_backoff_secs: u64,
    pub poll_interval_secs: u64,
    pub batch_size: u32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_backoff_secs: 5,
            max_backoff_secs: 600,
            poll_interval_secs: 5,
            batch_size: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub poll_interval_secs: u64,
    pub review_poll_interval_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            review_poll_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetainerConfig {
    pub firm_name: String,
    pub signer_name: String,
    pub recipient: String,
    /// Scheduling link used March through August.
    pub in_office_url: String,
    /// Scheduling link used September through February.
    pub virtual_url: String,
}

impl Default for RetainerConfig {
    fn default() -> Self {
        Self {
            firm_name: "Richards & Law".to_string(),
            signer_name: "Andrew Richards".to_string(),
            recipient: "talent.legal-engineer.hackathon.automation-email@swans.co".to_string(),
            in_office_url: "https://calendly.com/swans-santiago-p/summer-spring".to_string(),
            virtual_url: "https://calendly.com/swans-santiago-p/winter-autumn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
