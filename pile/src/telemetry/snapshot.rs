use serde::Serialize;

/// Point-in-time copy of [`super::TileMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub uptime_secs: u64,
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub tiles_culled: u64,
    pub upstream_unavailable: u64,
    pub rejected: u64,
    pub cache_read_errors: u64,
    pub cache_write_errors: u64,
    pub renders_requested: u64,
    pub renders_coalesced: u64,
    pub render_attempts: u64,
    pub render_attempt_failures: u64,
    pub renders_succeeded: u64,
    pub renders_exhausted: u64,
    pub stuck_requeued: u64,
    pub avg_render_ms: f64,
}
