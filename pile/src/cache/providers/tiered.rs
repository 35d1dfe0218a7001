//! Memory tier in front of a disk tier.
//!
//! Reads try memory first and promote disk hits. Writes go to both tiers;
//! only a disk failure is reported, since the durable tier is the source of
//! truth.

use std::sync::Arc;

use tracing::debug;

use super::{DiskCacheProvider, MemoryCacheProvider};
use crate::cache::traits::{BoxFuture, Cache, GcResult, ServiceCacheError};

pub struct TieredCacheProvider {
    memory: MemoryCacheProvider,
    disk: Arc<DiskCacheProvider>,
}

impl TieredCacheProvider {
    pub fn new(memory: MemoryCacheProvider, disk: Arc<DiskCacheProvider>) -> Self {
        Self { memory, disk }
    }

    pub fn disk(&self) -> &Arc<DiskCacheProvider> {
        &self.disk
    }
}

impl Cache for TieredCacheProvider {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            if let Err(e) = self.memory.set(&key, value.clone()).await {
                debug!(error = %e, key = %key, "Memory tier rejected value");
            }
            self.disk.set(&key, value).await
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            if let Some(hit) = self.memory.get(&key).await? {
                return Ok(Some(hit));
            }
            let found = self.disk.get(&key).await?;
            if let Some(data) = &found {
                let _ = self.memory.set(&key, data.clone()).await;
            }
            Ok(found)
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            let in_memory = self.memory.delete(&key).await?;
            let on_disk = self.disk.delete(&key).await?;
            Ok(in_memory || on_disk)
        })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self.memory.contains(&key).await? || self.disk.contains(&key).await?)
        })
    }

    fn size_bytes(&self) -> u64 {
        self.disk.size_bytes()
    }

    fn entry_count(&self) -> u64 {
        self.disk.entry_count()
    }

    fn max_size_bytes(&self) -> u64 {
        self.disk.max_size_bytes()
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>> {
        Box::pin(async move {
            let memory = self.memory.gc().await?;
            let disk = self.disk.gc().await?;
            Ok(GcResult {
                entries_removed: memory.entries_removed + disk.entries_removed,
                bytes_freed: memory.bytes_freed + disk.bytes_freed,
                duration_ms: memory.duration_ms + disk.duration_ms,
            })
        })
    }
}
