//! Pile - map tile cache and render orchestration
//!
//! Serves raster, vector and interaction-grid tiles for user layers and
//! multi-dataset cubes. Tiles come from a byte cache when possible; misses
//! inside the data extent are rendered once per key by a bounded worker pool
//! with retry, and the result is written through to the cache.
//!
//! # Layout
//!
//! - [`coord`]: tile coordinates and Web Mercator envelopes
//! - [`tile`]: tile requests, formats and cache keys
//! - [`cache`]: byte cache providers (memory, disk, tiered)
//! - [`metadata`]: layer and cube records, ingestion status
//! - [`resolver`]: request validation and cache-key resolution
//! - [`compositor`]: render spec assembly and extent culling
//! - [`render`]: style compiler and renderer seams
//! - [`coordinator`]: single-flight render jobs with priority and retry
//! - [`service`]: the tile request flow
//! - [`server`]: HTTP API
//! - [`app`]: wiring and lifecycle

pub mod app;
pub mod cache;
pub mod compositor;
pub mod config;
pub mod coord;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod placeholder;
pub mod remote;
pub mod render;
pub mod resolver;
pub mod server;
pub mod service;
pub mod telemetry;
pub mod tile;

pub use error::PileError;

/// Crate version, as reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
