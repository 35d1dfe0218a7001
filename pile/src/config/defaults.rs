//! Default values for `config.ini`.

use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3003;

/// 512 MB memory tier.
pub const DEFAULT_MEMORY_SIZE: u64 = 512 * 1024 * 1024;
/// 20 GB disk tier.
pub const DEFAULT_DISK_SIZE: u64 = 20 * 1024 * 1024 * 1024;
pub const DEFAULT_GC_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_RENDER_ENDPOINT: &str = "http://renderer:3004/render";
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 0;
pub const DEFAULT_LIVENESS_SECS: u64 = 60;
pub const DEFAULT_SWEEP_SECS: u64 = 10;

pub const DEFAULT_INGESTION_ENDPOINT: &str = "http://wu:3001/api/import/status";
pub const DEFAULT_INGESTION_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_DB_HOST: &str = "postgis";
pub const DEFAULT_DB_USER: &str = "docker";
pub const DEFAULT_DB_PASSWORD: &str = "docker";

pub const DEFAULT_LOG_FILE: &str = "pile.log";

/// `~/.pile`, or `./.pile` when the home directory is unknown.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pile")
}

pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

pub fn default_cache_directory() -> PathBuf {
    config_directory().join("cache").join("tiles")
}

pub fn default_metadata_directory() -> PathBuf {
    config_directory().join("metadata")
}

pub fn default_log_directory() -> PathBuf {
    config_directory().join("logs")
}
