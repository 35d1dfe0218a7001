//! Tile service telemetry.
//!
//! Request paths bump lock-free counters on [`TileMetrics`]; readers take a
//! [`TelemetrySnapshot`], a plain point-in-time copy that serializes to JSON
//! for the stats endpoint.
//!
//! ```text
//! TileService / RenderCoordinator ──► TileMetrics ──► TelemetrySnapshot ──► /api/stats
//! ```

mod metrics;
mod snapshot;

pub use metrics::TileMetrics;
pub use snapshot::TelemetrySnapshot;
