//! `ConfigFile` to the commented INI text written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let workers = config
        .render
        .workers
        .map(|w| w.to_string())
        .unwrap_or_else(|| "0".to_string());
    let access_token = config.ingestion.access_token.as_deref().unwrap_or("");

    format!(
        r#"[server]
; Address and port the HTTP API listens on
host = {}
port = {}

[cache]
; Tile cache backend:
;   memory - in-process only, lost on restart
;   disk   - one file per tile
;   tiered - memory in front of disk (recommended)
backend = {}
; Tile cache directory
directory = {}
; Layer and cube records. Never evicted.
metadata_directory = {}
; Supports: KB, MB, GB suffixes (e.g., 500MB, 2GB)
memory_size = {}
disk_size = {}
; Seconds between disk eviction passes. 0 disables eviction.
gc_interval_secs = {}

[render]
; Rendering engine endpoint. Receives a JSON render request per tile.
endpoint = {}
; Concurrent render workers (0 = one per CPU core)
workers = {}
; Seconds before a single render attempt is abandoned
timeout_secs = {}
; Attempts per tile before the failure is reported to every waiter
max_attempts = {}
; Delay between attempts in milliseconds
retry_delay_ms = {}
; Seconds a render may run before the sweeper requeues it
liveness_secs = {}
sweep_secs = {}

[ingestion]
; Ingestion status endpoint queried with ?file_id=<id>
endpoint = {}
timeout_secs = {}
; Sent as ?access_token= when set
access_token = {}

[datasource]
; Database credentials handed to the renderer.
; PILE_PGSQL_USERNAME and PILE_PGSQL_PASSWORD override user and password.
host = {}
user = {}
password = {}

[logging]
directory = {}
file = {}
"#,
        config.server.host,
        config.server.port,
        config.cache.backend,
        path_to_string(&config.cache.directory),
        path_to_string(&config.cache.metadata_directory),
        format_size(config.cache.memory_size),
        format_size(config.cache.disk_size),
        config.cache.gc_interval_secs,
        config.render.endpoint,
        workers,
        config.render.timeout_secs,
        config.render.max_attempts,
        config.render.retry_delay_ms,
        config.render.liveness_secs,
        config.render.sweep_secs,
        config.ingestion.endpoint,
        config.ingestion.timeout_secs,
        access_token,
        config.datasource.host,
        config.datasource.user,
        config.datasource.password,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Collapses the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
