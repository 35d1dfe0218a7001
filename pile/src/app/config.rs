//! Runtime configuration for `PileApp`.
//!
//! `AppConfig` is what `PileApp::start()` consumes. It is usually built from
//! the user's `config.ini` with [`AppConfig::from_config_file`]; tests build
//! it directly and adjust it with the `with_*` methods.

use std::net::SocketAddr;
use std::time::Duration;

use crate::cache::ServiceCacheConfig;
use crate::config::{CacheBackend, ConfigFile};
use crate::coordinator::{default_workers, CoordinatorConfig, RetryPolicy};
use crate::remote::DEFAULT_STATUS_TIMEOUT;
use crate::render::ConnectionParams;

/// Memory bound of the metadata store when no durable one is configured.
pub const DEFAULT_METADATA_MEMORY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Address the HTTP API binds to.
    pub listen: SocketAddr,

    /// Tile byte cache.
    pub tile_cache: ServiceCacheConfig,

    /// Layer and cube records.
    pub metadata_cache: ServiceCacheConfig,

    pub coordinator: CoordinatorConfig,

    pub render_endpoint: String,

    pub ingestion: IngestionAppConfig,

    /// Credentials placed in every datasource handed to the renderer.
    pub connection: ConnectionParams,
}

#[derive(Clone, Debug)]
pub struct IngestionAppConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub access_token: Option<String>,
}

impl AppConfig {
    /// Volatile caches and the built-in endpoints.
    pub fn new(tile_cache: ServiceCacheConfig) -> Self {
        let defaults = ConfigFile::default();
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], defaults.server.port)),
            tile_cache,
            metadata_cache: ServiceCacheConfig::memory(DEFAULT_METADATA_MEMORY_BYTES, None),
            coordinator: CoordinatorConfig::default(),
            render_endpoint: defaults.render.endpoint,
            ingestion: IngestionAppConfig {
                endpoint: defaults.ingestion.endpoint,
                timeout: DEFAULT_STATUS_TIMEOUT,
                access_token: None,
            },
            connection: ConnectionParams {
                host: defaults.datasource.host,
                user: defaults.datasource.user,
                password: defaults.datasource.password,
            },
        }
    }

    /// Translates the user's configuration file.
    ///
    /// Fails only when `[server] host` is not an IP address.
    pub fn from_config_file(config: &ConfigFile) -> Result<Self, String> {
        let host = config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| format!("server.host '{}': {}", config.server.host, e))?;

        let cache = &config.cache;
        let gc_interval =
            (cache.gc_interval_secs > 0).then(|| Duration::from_secs(cache.gc_interval_secs));
        let tile_cache = match cache.backend {
            CacheBackend::Memory => ServiceCacheConfig::memory(cache.memory_size, None),
            CacheBackend::Disk => {
                ServiceCacheConfig::disk(cache.disk_size, cache.directory.clone(), gc_interval)
            }
            CacheBackend::Tiered => ServiceCacheConfig::tiered(
                cache.memory_size,
                cache.disk_size,
                cache.directory.clone(),
                gc_interval,
            ),
        };

        // No eviction daemon, so the bound is never enforced
        let metadata_cache =
            ServiceCacheConfig::disk(u64::MAX, cache.metadata_directory.clone(), None);

        let render = &config.render;
        let coordinator = CoordinatorConfig::default()
            .with_workers(render.workers.unwrap_or_else(default_workers))
            .with_retry(RetryPolicy::fixed(
                render.max_attempts,
                Duration::from_millis(render.retry_delay_ms),
            ))
            .with_render_timeout(Duration::from_secs(render.timeout_secs))
            .with_liveness_threshold(Duration::from_secs(render.liveness_secs))
            .with_sweep_interval(Duration::from_secs(render.sweep_secs));

        Ok(Self {
            listen: SocketAddr::new(host, config.server.port),
            tile_cache,
            metadata_cache,
            coordinator,
            render_endpoint: render.endpoint.clone(),
            ingestion: IngestionAppConfig {
                endpoint: config.ingestion.endpoint.clone(),
                timeout: Duration::from_secs(config.ingestion.timeout_secs),
                access_token: config.ingestion.access_token.clone(),
            },
            connection: ConnectionParams {
                host: config.datasource.host.clone(),
                user: config.datasource.user.clone(),
                password: config.datasource.password.clone(),
            },
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.listen.set_port(port);
        self
    }

    pub fn with_metadata_cache(mut self, metadata_cache: ServiceCacheConfig) -> Self {
        self.metadata_cache = metadata_cache;
        self
    }

    pub fn with_coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn with_render_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.render_endpoint = endpoint.into();
        self
    }

    pub fn with_ingestion_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.ingestion.endpoint = endpoint.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.ingestion.access_token = Some(token.into());
        self
    }

    pub fn with_connection(mut self, connection: ConnectionParams) -> Self {
        self.connection = connection;
        self
    }
}
