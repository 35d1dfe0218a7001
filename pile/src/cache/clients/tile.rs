//! Tile cache client.
//!
//! Wraps the generic `Cache` with `CacheKey` translation and the tile-path
//! error policy: a read failure is reported as a miss, a write failure is
//! logged and dropped.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::cache::traits::Cache;
use crate::telemetry::TileMetrics;
use crate::tile::{CacheKey, TileBlob};

pub struct TileCacheClient {
    cache: Arc<dyn Cache>,
    metrics: Arc<TileMetrics>,
}

impl TileCacheClient {
    pub fn new(cache: Arc<dyn Cache>, metrics: Arc<TileMetrics>) -> Self {
        Self { cache, metrics }
    }

    /// Looks a tile up. Never fails; storage errors count as a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<TileBlob> {
        let text = key.to_string();
        match self.cache.get(&text).await {
            Ok(Some(data)) => {
                trace!(key = %text, bytes = data.len(), "Tile cache hit");
                Some(TileBlob::new(data, key.format))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, key = %text, "Tile cache read failed, treating as miss");
                self.metrics.cache_read_error();
                None
            }
        }
    }

    /// Stores a tile. Failures are logged, never returned.
    pub async fn put(&self, key: &CacheKey, blob: &TileBlob) {
        let text = key.to_string();
        if let Err(e) = self.cache.set(&text, blob.bytes.to_vec()).await {
            warn!(error = %e, key = %text, "Tile cache write failed");
            self.metrics.cache_write_error();
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.cache.size_bytes()
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
