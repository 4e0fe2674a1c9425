//! Service configuration file support.
//!
//! Settings are read from an optional `ingest.toml` and then overridden by
//! environment variables. A missing file yields the defaults.
//!
//! ```toml
//! [pipeline]
//! probe_timeout_ms = 30000
//! commit_timeout_ms = 30000
//! probe_concurrency = 8
//! header_rows = 1
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! max_upload_bytes = 10485760
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Ingestion pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Deadline of one existence probe (and of the read routes).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Deadline of the batch write.
    #[serde(default = "default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,
    /// Existence probes in flight at once.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
    /// Rows at the top of the sheet that hold column titles.
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_probe_timeout_ms() -> u64 {
    30_000
}

fn default_commit_timeout_ms() -> u64 {
    30_000
}

fn default_probe_concurrency() -> usize {
    8
}

fn default_header_rows() -> usize {
    1
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            commit_timeout_ms: default_commit_timeout_ms(),
            probe_concurrency: default_probe_concurrency(),
            header_rows: default_header_rows(),
        }
    }
}

impl PipelineSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerSettings {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl IngestConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `ingest.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// Returns the defaults when none exists.
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let search_paths = [
            PathBuf::from("ingest.toml"),
            PathBuf::from("backend/ingest.toml"),
            PathBuf::from("../ingest.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                log::info!("Loading configuration from {}", path.display());
                return Self::from_file(&path);
            }
        }

        log::debug!("No ingest.toml found; using default configuration");
        Ok(Self::default())
    }

    /// Default-location file, then environment overrides, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_default_location()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from `INGEST_*`, `HOST` and `PORT` variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_value("INGEST_PROBE_TIMEOUT_MS")? {
            self.pipeline.probe_timeout_ms = v;
        }
        if let Some(v) = env_value("INGEST_COMMIT_TIMEOUT_MS")? {
            self.pipeline.commit_timeout_ms = v;
        }
        if let Some(v) = env_value("INGEST_PROBE_CONCURRENCY")? {
            self.pipeline.probe_concurrency = v;
        }
        if let Some(v) = env_value("INGEST_HEADER_ROWS")? {
            self.pipeline.header_rows = v;
        }
        if let Ok(host) = std::env::var("HOST") {
            if !host.trim().is_empty() {
                self.server.host = host.trim().to_string();
            }
        }
        if let Some(v) = env_value("PORT")? {
            self.server.port = v;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid("probe_timeout_ms must be positive".into()));
        }
        if self.pipeline.commit_timeout_ms == 0 {
            return Err(ConfigError::Invalid("commit_timeout_ms must be positive".into()));
        }
        if self.pipeline.probe_concurrency == 0 {
            return Err(ConfigError::Invalid("probe_concurrency must be at least 1".into()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be positive".into()));
        }
        Ok(())
    }
}

/// Parse an environment variable; unset or blank reads as `None`.
fn env_value<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value: raw }),
        _ => Ok(None),
    }
}
