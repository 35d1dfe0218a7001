//! Typed sections of `config.ini`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::*;

/// Parsed configuration file. Every field has a default.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub cache: CacheSettings,
    pub render: RenderSettings,
    pub ingestion: IngestionSettings,
    pub datasource: DatasourceSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Which tile cache backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Disk,
    Tiered,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "disk" => Ok(CacheBackend::Disk),
            "tiered" => Ok(CacheBackend::Tiered),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Disk => "disk",
            CacheBackend::Tiered => "tiered",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub directory: PathBuf,
    /// Layer and cube records. Never evicted.
    pub metadata_directory: PathBuf,
    pub memory_size: u64,
    pub disk_size: u64,
    /// 0 disables disk eviction.
    pub gc_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub endpoint: String,
    /// `None` sizes the pool from the core count.
    pub workers: Option<usize>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub liveness_secs: u64,
    pub sweep_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub access_token: Option<String>,
}

#[derive(Clone, PartialEq)]
pub struct DatasourceSettings {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatasourceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasourceSettings")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            cache: CacheSettings {
                backend: CacheBackend::Tiered,
                directory: default_cache_directory(),
                metadata_directory: default_metadata_directory(),
                memory_size: DEFAULT_MEMORY_SIZE,
                disk_size: DEFAULT_DISK_SIZE,
                gc_interval_secs: DEFAULT_GC_INTERVAL_SECS,
            },
            render: RenderSettings {
                endpoint: DEFAULT_RENDER_ENDPOINT.to_string(),
                workers: None,
                timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
                liveness_secs: DEFAULT_LIVENESS_SECS,
                sweep_secs: DEFAULT_SWEEP_SECS,
            },
            ingestion: IngestionSettings {
                endpoint: DEFAULT_INGESTION_ENDPOINT.to_string(),
                timeout_secs: DEFAULT_INGESTION_TIMEOUT_SECS,
                access_token: None,
            },
            datasource: DatasourceSettings {
                host: DEFAULT_DB_HOST.to_string(),
                user: DEFAULT_DB_USER.to_string(),
                password: DEFAULT_DB_PASSWORD.to_string(),
            },
            logging: LoggingSettings {
                directory: default_log_directory(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
