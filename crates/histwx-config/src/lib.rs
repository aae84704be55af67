use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub data_file: Option<String>,
    pub skip_header: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: Option<StoreBackend>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_page_size: Option<usize>,
    pub max_page_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "json" or "pretty"
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub logging: Option<LoggingConfig>,
    pub server: Option<ServerConfig>,
    pub ingest: Option<IngestConfig>,
    pub store: Option<StoreConfig>,
    pub query: Option<QueryConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppConfig {
    /// Load configuration from HISTWX_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HISTWX_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(path)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    /// HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }

    /// Feed file ingested at startup (default data/weather.csv)
    pub fn data_file(&self) -> String {
        self.ingest
            .as_ref()
            .and_then(|i| i.data_file.clone())
            .unwrap_or_else(|| "data/weather.csv".to_string())
    }

    pub fn skip_header(&self) -> bool {
        self.ingest
            .as_ref()
            .and_then(|i| i.skip_header)
            .unwrap_or(true)
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.store
            .as_ref()
            .and_then(|s| s.backend)
            .unwrap_or_default()
    }

    /// SQLite database path (default histwx.db)
    pub fn store_path(&self) -> String {
        self.store
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(|| "histwx.db".to_string())
    }

    /// Log format name (default json)
    pub fn log_format(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|l| l.format.clone())
            .unwrap_or_else(|| "json".to_string())
    }

    pub fn default_page_size(&self) -> usize {
        self.query
            .as_ref()
            .and_then(|q| q.default_page_size)
            .unwrap_or(100)
    }

    pub fn max_page_size(&self) -> usize {
        self.query
            .as_ref()
            .and_then(|q| q.max_page_size)
            .unwrap_or(1000)
    }
}
