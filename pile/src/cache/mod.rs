//! Tile cache store.
//!
//! A byte-oriented [`Cache`] trait with memory, disk and tiered providers, a
//! [`CacheService`] that picks one at startup, and the [`TileCacheClient`]
//! that speaks `CacheKey` and applies the tile-path error policy.

mod config;
mod service;
mod traits;

pub mod clients;
pub mod providers;

pub use clients::TileCacheClient;
pub use config::{DiskProviderConfig, ProviderConfig, ServiceCacheConfig, DEFAULT_GC_INTERVAL};
pub use providers::{DiskCacheProvider, MemoryCacheProvider, TieredCacheProvider};
pub use service::CacheService;
pub use traits::{BoxFuture, Cache, GcResult, ServiceCacheError};
