//! Domain clients over the generic `Cache`.
//!
//! ```text
//! TileCacheClient   CacheKey → "layer:L:{hash}:10:511:340:png"
//!        │
//!        ▼
//!  Arc<dyn Cache>   memory | disk | tiered
//! ```

mod tile;

pub use tile::TileCacheClient;
