//! `Ini` to `ConfigFile`. The only place INI key names map to fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::{CacheBackend, ConfigFile};
use super::size::parse_size;

const SIZE_REASON: &str = "expected format like '2GB', '500MB', or '1024KB'";

/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = non_empty(section, "host") {
            config.server.host = v.to_string();
        }
        if let Some(v) = section.get("port") {
            config.server.port = parse_number(
                "server",
                "port",
                v,
                "must be a port number between 1 and 65535",
            )?;
            if config.server.port == 0 {
                return Err(invalid(
                    "server",
                    "port",
                    v,
                    "must be a port number between 1 and 65535",
                ));
            }
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("backend") {
            config.cache.backend = CacheBackend::from_str(v)
                .map_err(|_| invalid("cache", "backend", v, "must be one of: memory, disk, tiered"))?;
        }
        if let Some(v) = non_empty(section, "directory") {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "metadata_directory") {
            config.cache.metadata_directory = expand_tilde(v);
        }
        if let Some(v) = section.get("memory_size") {
            config.cache.memory_size =
                parse_size(v).map_err(|_| invalid("cache", "memory_size", v, SIZE_REASON))?;
        }
        if let Some(v) = section.get("disk_size") {
            config.cache.disk_size =
                parse_size(v).map_err(|_| invalid("cache", "disk_size", v, SIZE_REASON))?;
        }
        if let Some(v) = section.get("gc_interval_secs") {
            config.cache.gc_interval_secs = parse_number(
                "cache",
                "gc_interval_secs",
                v,
                "must be a non-negative integer (seconds, 0 disables eviction)",
            )?;
        }
    }

    if let Some(section) = ini.section(Some("render")) {
        if let Some(v) = non_empty(section, "endpoint") {
            config.render.endpoint = v.to_string();
        }
        if let Some(v) = section.get("workers") {
            let workers: usize =
                parse_number("render", "workers", v, "must be a non-negative integer")?;
            config.render.workers = (workers > 0).then_some(workers);
        }
        if let Some(v) = section.get("timeout_secs") {
            config.render.timeout_secs = positive("render", "timeout_secs", v, "seconds")?;
        }
        if let Some(v) = section.get("max_attempts") {
            config.render.max_attempts = parse_number(
                "render",
                "max_attempts",
                v,
                "must be a positive integer",
            )?;
            if config.render.max_attempts == 0 {
                return Err(invalid("render", "max_attempts", v, "must be a positive integer"));
            }
        }
        if let Some(v) = section.get("retry_delay_ms") {
            config.render.retry_delay_ms = parse_number(
                "render",
                "retry_delay_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("liveness_secs") {
            config.render.liveness_secs = positive("render", "liveness_secs", v, "seconds")?;
        }
        if let Some(v) = section.get("sweep_secs") {
            config.render.sweep_secs = positive("render", "sweep_secs", v, "seconds")?;
        }
    }

    if let Some(section) = ini.section(Some("ingestion")) {
        if let Some(v) = non_empty(section, "endpoint") {
            config.ingestion.endpoint = v.to_string();
        }
        if let Some(v) = section.get("timeout_secs") {
            config.ingestion.timeout_secs = positive("ingestion", "timeout_secs", v, "seconds")?;
        }
        if let Some(v) = non_empty(section, "access_token") {
            config.ingestion.access_token = Some(v.to_string());
        }
    }

    if let Some(section) = ini.section(Some("datasource")) {
        if let Some(v) = non_empty(section, "host") {
            config.datasource.host = v.to_string();
        }
        if let Some(v) = non_empty(section, "user") {
            config.datasource.user = v.to_string();
        }
        if let Some(v) = section.get("password") {
            config.datasource.password = v.to_string();
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn positive(section: &str, key: &str, value: &str, unit: &str) -> Result<u64, ConfigFileError> {
    let reason = format!("must be a positive integer ({})", unit);
    match parse_number::<u64>(section, key, value, &reason)? {
        0 => Err(invalid(section, key, value, &reason)),
        n => Ok(n),
    }
}

pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
