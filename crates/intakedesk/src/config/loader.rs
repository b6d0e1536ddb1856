use std::path::{Path, PathBuf};

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;
use crate::secrets::expand_home;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.yaml` and `.yml` are YAML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Json,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, ConfigFormat::from_path(path))
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let config: Config = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |message: String| Err(ConfigError::Validation { message });

    if config.version != CONFIG_VERSION {
        return invalid(format!("Unsupported config version: {}", config.version));
    }
    if config.server.port == 0 {
        return invalid("server.port must be non-zero".to_string());
    }
    if config.storage.directory.trim().is_empty() {
        return invalid("storage.directory must not be empty".to_string());
    }
    if config.storage.max_upload_bytes == 0 {
        return invalid("storage.max_upload_bytes must be positive".to_string());
    }

    let outbox = &config.outbox;
    if outbox.max_attempts == 0 {
        return invalid("outbox.max_attempts must be at least 1".to_string());
    }
    if outbox.base_backoff_secs > outbox.max_backoff_secs {
        return invalid(format!(
            "outbox.base_backoff_secs ({}) exceeds outbox.max_backoff_secs ({})",
            outbox.base_backoff_secs, outbox.max_backoff_secs
        ));
    }
    if outbox.batch_size == 0 {
        return invalid("outbox.batch_size must be at least 1".to_string());
    }

    Ok(())
}

impl Config {
    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database.path {
            Some(path) => Some(PathBuf::from(expand_home(path))),
            None => crate::db::default_database_path(),
        }
    }

    pub fn storage_directory(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.storage.directory))
    }

    /// Base URL for stored documents; defaults to this server's `/documents`.
    pub fn public_base_url(&self) -> String {
        match &self.storage.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "http://{}:{}/documents",
                self.server.host, self.server.port
            ),
        }
    }
}
