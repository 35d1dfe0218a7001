//! Durable tier storing one file per key.
//!
//! # File Layout
//!
//! ```text
//! {directory}/{sha256(key)}.cache
//! ```
//!
//! Writes land in a uniquely named temp file first and are renamed into
//! place, so a concurrent reader sees either the previous bytes or the new
//! ones, never a partial file.
//!
//! # Eviction
//!
//! When a GC interval is configured the provider owns a daemon that deletes
//! the oldest files (by mtime) once the directory exceeds its limit, until it
//! is back under 90% of the limit.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::config::DiskProviderConfig;
use crate::cache::traits::{BoxFuture, Cache, GcResult, ServiceCacheError};

/// Fraction of the limit the eviction pass shrinks the directory to.
const EVICTION_TARGET_PERCENTAGE: f64 = 0.9;

const ENTRY_EXTENSION: &str = "cache";

pub struct DiskCacheProvider {
    directory: PathBuf,
    max_size_bytes: u64,
    /// Running size estimate; rescanned on every GC pass.
    cached_size: AtomicU64,
    cached_count: AtomicU64,
    temp_counter: AtomicU64,
    gc_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl DiskCacheProvider {
    /// Creates the directory if needed, measures what is already there and
    /// starts the GC daemon when one is configured.
    pub async fn start(config: DiskProviderConfig) -> Result<Arc<Self>, ServiceCacheError> {
        tokio::fs::create_dir_all(&config.directory).await?;

        let provider = Arc::new(Self {
            directory: config.directory.clone(),
            max_size_bytes: config.max_size_bytes,
            cached_size: AtomicU64::new(0),
            cached_count: AtomicU64::new(0),
            temp_counter: AtomicU64::new(0),
            gc_handle: Mutex::new(None),
            shutdown: CancellationToken::new(),
        });

        provider.rescan().await?;

        if let Some(interval) = config.gc_interval {
            let daemon = Arc::clone(&provider);
            let handle = tokio::spawn(async move {
                daemon.run_gc_daemon(interval).await;
            });
            *provider.gc_handle.lock() = Some(handle);
        }

        info!(
            dir = %config.directory.display(),
            max_bytes = config.max_size_bytes,
            gc_interval_secs = config.gc_interval.map(|d| d.as_secs()),
            entries = provider.cached_count.load(Ordering::Relaxed),
            "Disk cache provider started"
        );

        Ok(provider)
    }

    /// Stops the GC daemon and waits for an in-progress pass to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.gc_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!(dir = %self.directory.display(), "Disk cache provider stopped");
    }

    async fn run_gc_daemon(&self, interval: std::time::Duration) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.run_gc_cycle().await {
                        warn!(error = %e, "Disk cache GC cycle failed");
                    }
                }
            }
        }
    }

    async fn rescan(&self) -> Result<(), ServiceCacheError> {
        let directory = self.directory.clone();
        let files = tokio::task::spawn_blocking(move || collect_entries(&directory))
            .await
            .map_err(|e| ServiceCacheError::SpawnError(e.to_string()))?;

        self.cached_size
            .store(files.iter().map(|(_, _, size)| size).sum(), Ordering::Relaxed);
        self.cached_count
            .store(files.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn run_gc_cycle(&self) -> Result<GcResult, ServiceCacheError> {
        let directory = self.directory.clone();
        let max_bytes = self.max_size_bytes;

        let (result, remaining_size, remaining_count) =
            tokio::task::spawn_blocking(move || evict_blocking(&directory, max_bytes))
                .await
                .map_err(|e| ServiceCacheError::SpawnError(e.to_string()))?;

        self.cached_size.store(remaining_size, Ordering::Relaxed);
        self.cached_count.store(remaining_count, Ordering::Relaxed);

        if result.entries_removed > 0 {
            info!(
                entries_removed = result.entries_removed,
                bytes_freed = result.bytes_freed,
                duration_ms = result.duration_ms,
                "Disk cache GC complete"
            );
        }

        Ok(result)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let mut name = String::with_capacity(digest.len() * 2 + 6);
        for byte in digest {
            let _ = write!(name, "{:02x}", byte);
        }
        name.push('.');
        name.push_str(ENTRY_EXTENSION);
        self.directory.join(name)
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("{}.tmp", n))
    }
}

fn saturating_sub(counter: &AtomicU64, n: u64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(v.saturating_sub(n))
    });
}

fn collect_entries(dir: &Path) -> Vec<(PathBuf, SystemTime, u64)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Failed to read cache directory");
            return Vec::new();
        }
    };

    entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                return None;
            }
            let metadata = entry.metadata().ok()?;
            let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((path, mtime, metadata.len()))
        })
        .collect()
}

/// Returns the pass result plus the remaining size and entry count.
fn evict_blocking(dir: &Path, max_bytes: u64) -> (GcResult, u64, u64) {
    let start = Instant::now();
    let mut files = collect_entries(dir);
    let total_size: u64 = files.iter().map(|(_, _, size)| size).sum();
    let mut remaining_count = files.len() as u64;

    if total_size <= max_bytes {
        let result = GcResult {
            duration_ms: start.elapsed().as_millis() as u64,
            ..GcResult::default()
        };
        return (result, total_size, remaining_count);
    }

    let target_size = (max_bytes as f64 * EVICTION_TARGET_PERCENTAGE) as u64;
    files.sort_by_key(|(_, mtime, _)| *mtime);

    let mut remaining_size = total_size;
    let mut bytes_freed = 0u64;
    let mut entries_removed = 0usize;

    for (path, _, size) in files {
        if remaining_size <= target_size {
            break;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                remaining_size = remaining_size.saturating_sub(size);
                remaining_count = remaining_count.saturating_sub(1);
                bytes_freed += size;
                entries_removed += 1;
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Failed to evict cache file");
            }
        }
    }

    let result = GcResult {
        entries_removed,
        bytes_freed,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    (result, remaining_size, remaining_count)
}

impl Cache for DiskCacheProvider {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            let temp = self.temp_path(&path);
            let previous = tokio::fs::metadata(&path).await.ok().map(|m| m.len());

            let written = match tokio::fs::write(&temp, &value).await {
                Ok(()) => tokio::fs::rename(&temp, &path).await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e.into());
            }

            match previous {
                Some(old) => saturating_sub(&self.cached_size, old),
                None => {
                    self.cached_count.fetch_add(1, Ordering::Relaxed);
                }
            }
            self.cached_size
                .fetch_add(value.len() as u64, Ordering::Relaxed);
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            let size = match tokio::fs::metadata(&path).await {
                Ok(m) => m.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    saturating_sub(&self.cached_size, size);
                    saturating_sub(&self.cached_count, 1);
                    Ok(true)
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let path = self.key_path(key);
        Box::pin(async move { Ok(tokio::fs::try_exists(&path).await?) })
    }

    fn size_bytes(&self) -> u64 {
        self.cached_size.load(Ordering::Relaxed)
    }

    fn entry_count(&self) -> u64 {
        self.cached_count.load(Ordering::Relaxed)
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>> {
        Box::pin(self.run_gc_cycle())
    }
}
