//! Cache provider implementations.
//!
//! - [`MemoryCacheProvider`]: volatile, moka-backed
//! - [`DiskCacheProvider`]: one file per key with an eviction daemon
//! - [`TieredCacheProvider`]: memory in front of disk
//!
//! Application code obtains providers through `CacheService::start()`.

mod disk;
mod memory;
mod tiered;

pub use disk::DiskCacheProvider;
pub use memory::MemoryCacheProvider;
pub use tiered::TieredCacheProvider;
