//! Cache service lifecycle.
//!
//! The backend is chosen once, when the service starts; everything downstream
//! holds an `Arc<dyn Cache>` and never learns which tier it talks to.

use std::sync::Arc;

use tracing::info;

use crate::cache::config::{DiskProviderConfig, ProviderConfig, ServiceCacheConfig};
use crate::cache::providers::{DiskCacheProvider, MemoryCacheProvider, TieredCacheProvider};
use crate::cache::traits::{Cache, ServiceCacheError};

/// A running cache backend.
pub struct CacheService {
    cache: Arc<dyn Cache>,
    backend: &'static str,
    /// Disk tier, kept so shutdown can stop its GC daemon.
    disk: Option<Arc<DiskCacheProvider>>,
}

impl CacheService {
    /// Starts the provider described by `config`.
    ///
    /// # Errors
    ///
    /// Fails when a disk directory cannot be created or scanned.
    pub async fn start(config: ServiceCacheConfig) -> Result<Self, ServiceCacheError> {
        let backend = config.backend_name();

        let (cache, disk): (Arc<dyn Cache>, _) = match config.provider {
            ProviderConfig::Memory { ttl } => {
                let provider = MemoryCacheProvider::new(config.max_size_bytes, ttl);
                (Arc::new(provider), None)
            }
            ProviderConfig::Disk {
                directory,
                gc_interval,
            } => {
                let provider = DiskCacheProvider::start(DiskProviderConfig {
                    directory,
                    max_size_bytes: config.max_size_bytes,
                    gc_interval,
                })
                .await?;
                (Arc::clone(&provider) as Arc<dyn Cache>, Some(provider))
            }
            ProviderConfig::Tiered {
                memory_bytes,
                directory,
                gc_interval,
            } => {
                let disk = DiskCacheProvider::start(DiskProviderConfig {
                    directory,
                    max_size_bytes: config.max_size_bytes,
                    gc_interval,
                })
                .await?;
                let memory = MemoryCacheProvider::new(memory_bytes, None);
                let tiered = TieredCacheProvider::new(memory, Arc::clone(&disk));
                (Arc::new(tiered), Some(disk))
            }
        };

        info!(
            backend,
            max_bytes = config.max_size_bytes,
            "Cache service started"
        );

        Ok(Self {
            cache,
            backend,
            disk,
        })
    }

    /// Shared handle to the cache.
    pub fn cache(&self) -> Arc<dyn Cache> {
        Arc::clone(&self.cache)
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Stops background work. Memory-only services have nothing to stop.
    pub async fn shutdown(self) {
        if let Some(disk) = self.disk {
            disk.shutdown().await;
        }
        info!(backend = self.backend, "Cache service stopped");
    }
}
