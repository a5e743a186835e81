use crate::constants::*;
use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Startup configuration, built once in `main` and handed to every component.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub http: HttpConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Azure,
    Local,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(StoreBackend::Azure),
            "local" | "fs" => Ok(StoreBackend::Local),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(IngestError::Config(format!("unknown store backend '{}'", other))),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    /// Azure storage connection string. Required for the `azure` backend.
    pub connection_string: Option<String>,
    /// Root directory for the `local` backend.
    pub local_root: PathBuf,
    pub config_container: String,
    pub config_blob: String,
    pub data_container: String,
}

// The connection string carries the account key; keep it out of logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("connection_string", &self.connection_string.as_ref().map(|_| "<redacted>"))
            .field("local_root", &self.local_root)
            .field("config_container", &self.config_container)
            .field("config_blob", &self.config_blob)
            .field("data_container", &self.data_container)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Azure,
            connection_string: None,
            local_root: PathBuf::from(DEFAULT_LOCAL_ROOT),
            config_container: DEFAULT_CONFIG_CONTAINER.to_string(),
            config_blob: DEFAULT_CONFIG_BLOB.to_string(),
            data_container: DEFAULT_DATA_CONTAINER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Routing key used when a trigger does not name one. `None` ingests everything.
    pub routing_key: Option<String>,
    pub interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            routing_key: Some(DEFAULT_ROUTING_KEY.to_string()),
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl IngestConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl HttpConfig {
    /// Per-request budget shared by the feed client and the blob store.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides.
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new("config.toml").exists() => Self::from_file(Path::new("config.toml"))?,
            None => AppConfig::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_CONNECTION_STRING) {
            self.storage.connection_string = Some(v);
        }
        if let Some(v) = lookup(ENV_STORE_BACKEND) {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = lookup(ENV_LOCAL_ROOT) {
            self.storage.local_root = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_CONFIG_CONTAINER) {
            self.storage.config_container = v;
        }
        if let Some(v) = lookup(ENV_CONFIG_BLOB) {
            self.storage.config_blob = v;
        }
        if let Some(v) = lookup(ENV_DATA_CONTAINER) {
            self.storage.data_container = v;
        }
        if let Some(v) = lookup(ENV_ROUTING_KEY) {
            let v = v.trim().to_string();
            self.ingest.routing_key = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup(ENV_PORT) {
            self.server.port = v
                .parse()
                .map_err(|_| IngestError::Config(format!("{} is not a valid port: '{}'", ENV_PORT, v)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.storage;
        if s.backend == StoreBackend::Azure
            && s.connection_string.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            return Err(IngestError::Config(format!(
                "the azure store backend requires a connection string (set {})",
                ENV_CONNECTION_STRING
            )));
        }
        for (name, value) in [
            ("storage.config_container", &s.config_container),
            ("storage.config_blob", &s.config_blob),
            ("storage.data_container", &s.data_container),
        ] {
            if value.trim().is_empty() {
                return Err(IngestError::Config(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}
