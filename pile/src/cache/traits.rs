//! The byte-store interface every cache tier implements.
//!
//! Keys are the canonical strings produced by `CacheKey`'s `Display`, values
//! are encoded tile bytes the store never inspects. Async methods return boxed
//! futures so providers can sit behind `Arc<dyn Cache>` and be chosen at
//! startup.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcResult {
    pub entries_removed: usize,
    pub bytes_freed: u64,
    pub duration_ms: u64,
}

impl fmt::Display for GcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GC: removed {} entries, freed {} bytes in {}ms",
            self.entries_removed, self.bytes_freed, self.duration_ms
        )
    }
}

/// Failures raised by cache providers.
///
/// Callers on the tile path never propagate these: a read error is a miss and
/// a write error is logged.
#[derive(Debug, Error)]
pub enum ServiceCacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: u64 },

    #[error("Failed to spawn task: {0}")]
    SpawnError(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Key-value byte storage.
///
/// `get` reports absence as `Ok(None)`. `set` replaces any previous value, so
/// repeating a write is harmless and the last writer wins.
pub trait Cache: Send + Sync {
    /// Stores `value` under `key`, possibly evicting older entries.
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>>;

    /// Looks `key` up.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>>;

    /// Removes `key`, returning whether it existed.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>>;

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>>;

    /// Approximate stored size in bytes.
    fn size_bytes(&self) -> u64;

    /// Approximate number of stored entries.
    fn entry_count(&self) -> u64;

    fn max_size_bytes(&self) -> u64;

    /// Runs one eviction pass now instead of waiting for the provider's own
    /// schedule.
    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>>;
}
