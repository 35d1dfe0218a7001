//! Application bootstrap and lifecycle management.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                          PileApp                          │
//! │                                                           │
//! │  1. CacheService (tiles) ──► TileCacheClient              │
//! │     └── memory / disk / tiered provider, GC daemon        │
//! │                                                           │
//! │  2. CacheService (metadata) ──► KvMetadataStore           │
//! │                                                           │
//! │  3. RenderCoordinator ──► RenderPipeline                  │
//! │     └── workers + stuck sweeper     └── compiler, renderer│
//! │                                                           │
//! │  4. TileService, LayerService, CubeService ──► router()   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pile::app::{AppConfig, PileApp};
//!
//! let app = PileApp::start(config).await?;
//! pile::server::serve(app.router(), app.config().listen, shutdown).await?;
//! app.shutdown().await;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::{Collaborators, PileApp};
pub use config::{AppConfig, IngestionAppConfig, DEFAULT_METADATA_MEMORY_BYTES};
pub use error::AppError;
