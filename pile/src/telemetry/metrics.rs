//! Lock-free counters.
//!
//! Counters are independent measurements, so `Relaxed` ordering is enough.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::TelemetrySnapshot;

pub struct TileMetrics {
    start_time: Instant,

    // === Request outcomes ===
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    tiles_culled: AtomicU64,
    upstream_unavailable: AtomicU64,
    rejected: AtomicU64,

    // === Cache store ===
    cache_read_errors: AtomicU64,
    cache_write_errors: AtomicU64,

    // === Render coordination ===
    renders_requested: AtomicU64,
    renders_coalesced: AtomicU64,
    render_attempts: AtomicU64,
    render_attempt_failures: AtomicU64,
    renders_succeeded: AtomicU64,
    renders_exhausted: AtomicU64,
    stuck_requeued: AtomicU64,
    render_time_us: AtomicU64,
}

impl TileMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            tiles_culled: AtomicU64::new(0),
            upstream_unavailable: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            cache_read_errors: AtomicU64::new(0),
            cache_write_errors: AtomicU64::new(0),
            renders_requested: AtomicU64::new(0),
            renders_coalesced: AtomicU64::new(0),
            render_attempts: AtomicU64::new(0),
            render_attempt_failures: AtomicU64::new(0),
            renders_succeeded: AtomicU64::new(0),
            renders_exhausted: AtomicU64::new(0),
            stuck_requeued: AtomicU64::new(0),
            render_time_us: AtomicU64::new(0),
        }
    }

    pub fn request_received(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tile_culled(&self) {
        self.tiles_culled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn upstream_unavailable(&self) {
        self.upstream_unavailable.fetch_add(1, Ordering::Relaxed);
    }

    /// A request failed validation or named an unknown resource.
    pub fn request_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_read_error(&self) {
        self.cache_read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_write_error(&self) {
        self.cache_write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_requested(&self) {
        self.renders_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// A caller joined a render already queued or running for its key.
    pub fn render_coalesced(&self) {
        self.renders_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_attempt_started(&self) {
        self.render_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_attempt_failed(&self) {
        self.render_attempt_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_succeeded(&self, elapsed_us: u64) {
        self.renders_succeeded.fetch_add(1, Ordering::Relaxed);
        self.render_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
    }

    pub fn render_exhausted(&self) {
        self.renders_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stuck_render_requeued(&self) {
        self.stuck_requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        let hits = load(&self.cache_hits);
        let misses = load(&self.cache_misses);
        let succeeded = load(&self.renders_succeeded);

        TelemetrySnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            requests: load(&self.requests),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: if hits + misses == 0 {
                0.0
            } else {
                hits as f64 / (hits + misses) as f64
            },
            tiles_culled: load(&self.tiles_culled),
            upstream_unavailable: load(&self.upstream_unavailable),
            rejected: load(&self.rejected),
            cache_read_errors: load(&self.cache_read_errors),
            cache_write_errors: load(&self.cache_write_errors),
            renders_requested: load(&self.renders_requested),
            renders_coalesced: load(&self.renders_coalesced),
            render_attempts: load(&self.render_attempts),
            render_attempt_failures: load(&self.render_attempt_failures),
            renders_succeeded: succeeded,
            renders_exhausted: load(&self.renders_exhausted),
            stuck_requeued: load(&self.stuck_requeued),
            avg_render_ms: if succeeded == 0 {
                0.0
            } else {
                load(&self.render_time_us) as f64 / succeeded as f64 / 1000.0
            },
        }
    }
}

impl Default for TileMetrics {
    fn default() -> Self {
        Self::new()
    }
}
