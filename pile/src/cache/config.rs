//! Cache service configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default interval between disk eviction passes.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for one cache service instance.
#[derive(Debug, Clone)]
pub struct ServiceCacheConfig {
    /// Size bound of the durable tier, or of the only tier for memory caches.
    pub max_size_bytes: u64,
    pub provider: ProviderConfig,
}

/// Which backend serves the cache.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    /// Volatile in-process store.
    Memory { ttl: Option<Duration> },

    /// One file per key under `directory`.
    ///
    /// `gc_interval: None` disables the eviction daemon, which makes the
    /// store unbounded.
    Disk {
        directory: PathBuf,
        gc_interval: Option<Duration>,
    },

    /// Memory tier of `memory_bytes` in front of a disk tier.
    Tiered {
        memory_bytes: u64,
        directory: PathBuf,
        gc_interval: Option<Duration>,
    },
}

impl ServiceCacheConfig {
    pub fn memory(max_size_bytes: u64, ttl: Option<Duration>) -> Self {
        Self {
            max_size_bytes,
            provider: ProviderConfig::Memory { ttl },
        }
    }

    pub fn disk(max_size_bytes: u64, directory: PathBuf, gc_interval: Option<Duration>) -> Self {
        Self {
            max_size_bytes,
            provider: ProviderConfig::Disk {
                directory,
                gc_interval,
            },
        }
    }

    pub fn tiered(
        memory_bytes: u64,
        disk_bytes: u64,
        directory: PathBuf,
        gc_interval: Option<Duration>,
    ) -> Self {
        Self {
            max_size_bytes: disk_bytes,
            provider: ProviderConfig::Tiered {
                memory_bytes,
                directory,
                gc_interval,
            },
        }
    }

    /// Short backend name for logs.
    pub fn backend_name(&self) -> &'static str {
        match self.provider {
            ProviderConfig::Memory { .. } => "memory",
            ProviderConfig::Disk { .. } => "disk",
            ProviderConfig::Tiered { .. } => "tiered",
        }
    }
}

/// Settings a disk provider starts from.
#[derive(Debug, Clone)]
pub struct DiskProviderConfig {
    pub directory: PathBuf,
    pub max_size_bytes: u64,
    pub gc_interval: Option<Duration>,
}
