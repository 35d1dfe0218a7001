//! Tile request control flow.
//!
//! ```text
//! resolve ──► cache get ──► hit ───────────────────────► bytes
//!                 │ miss
//!                 ▼
//!           extent cull ──► outside ───────────────────► empty tile
//!                 │ inside
//!                 ▼
//!         coordinator (single-flight, retry, write-through) ► bytes
//! ```
//!
//! [`TileService::serve`] never fails: every error degrades to a
//! placeholder tile in the requested format.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::cache::TileCacheClient;
use crate::compositor::Compositor;
use crate::coordinator::{CoordinatorStats, Priority, RenderCoordinator};
use crate::error::PileError;
use crate::placeholder::PlaceholderTiles;
use crate::resolver::TileResolver;
use crate::telemetry::{TelemetrySnapshot, TileMetrics};
use crate::tile::{OwnerKind, TileBlob, TileFormat, TileRequest};

/// How `fetch` produced a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileFetch {
    Cached(TileBlob),
    Rendered(TileBlob),
    /// Outside the data extent. Nothing was rendered or stored.
    Empty,
}

/// Outcome label of a served tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileOutcome {
    Cached,
    Rendered,
    Empty,
    Error,
}

impl TileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileOutcome::Cached => "cached",
            TileOutcome::Rendered => "rendered",
            TileOutcome::Empty => "empty",
            TileOutcome::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub blob: TileBlob,
    pub outcome: TileOutcome,
}

/// Runtime statistics exposed by the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub telemetry: TelemetrySnapshot,
    pub coordinator: CoordinatorStats,
    pub cache_entries: u64,
    pub cache_bytes: u64,
}

pub struct TileService {
    resolver: TileResolver,
    compositor: Compositor,
    coordinator: Arc<RenderCoordinator>,
    cache: Arc<TileCacheClient>,
    placeholders: PlaceholderTiles,
    metrics: Arc<TileMetrics>,
}

impl TileService {
    pub fn new(
        resolver: TileResolver,
        compositor: Compositor,
        coordinator: Arc<RenderCoordinator>,
        cache: Arc<TileCacheClient>,
        placeholders: PlaceholderTiles,
        metrics: Arc<TileMetrics>,
    ) -> Self {
        Self {
            resolver,
            compositor,
            coordinator,
            cache,
            placeholders,
            metrics,
        }
    }

    /// Produces the tile for a validated request.
    ///
    /// Client requests render at [`Priority::HIGH`].
    #[instrument(skip(self, request), fields(tile = %request))]
    pub async fn fetch(&self, request: TileRequest) -> Result<TileFetch, PileError> {
        let resolved = self.resolver.resolve(request).await?;

        if let Some(blob) = self.cache.get(&resolved.key).await {
            self.metrics.cache_hit();
            return Ok(TileFetch::Cached(blob));
        }
        self.metrics.cache_miss();

        if self.compositor.is_outside_extent(&resolved) {
            self.metrics.tile_culled();
            debug!(key = %resolved.key, "Serving empty tile, outside extent");
            return Ok(TileFetch::Empty);
        }

        let key = resolved.key.clone();
        let compositor = self.compositor.clone();
        let tile = Arc::new(resolved);
        let blob = self
            .coordinator
            .request_render(key, Priority::HIGH, move || compositor.build_spec(&tile))
            .await?;

        Ok(TileFetch::Rendered(blob))
    }

    /// Parses raw path segments and serves the tile, degrading any failure
    /// to a placeholder.
    pub async fn serve(&self, kind: OwnerKind, segments: &[&str]) -> TileResponse {
        self.metrics.request_received();

        let request = match TileResolver::parse(kind, segments) {
            Ok(request) => request,
            Err(e) => {
                self.metrics.request_rejected();
                debug!(error = %e, ?segments, "Rejected tile request");
                return self.error_tile(requested_format(segments));
            }
        };

        let format = request.format;
        match self.fetch(request).await {
            Ok(TileFetch::Cached(blob)) => TileResponse {
                blob,
                outcome: TileOutcome::Cached,
            },
            Ok(TileFetch::Rendered(blob)) => TileResponse {
                blob,
                outcome: TileOutcome::Rendered,
            },
            Ok(TileFetch::Empty) => TileResponse {
                blob: self.placeholders.empty(format),
                outcome: TileOutcome::Empty,
            },
            Err(e) => {
                self.record_failure(&e);
                self.error_tile(format)
            }
        }
    }

    fn record_failure(&self, err: &PileError) {
        match err {
            PileError::Validation { .. } | PileError::NotFound(_) => {
                self.metrics.request_rejected();
                debug!(error = %err, "Tile request rejected");
            }
            PileError::UpstreamUnavailable(_) => {
                self.metrics.upstream_unavailable();
                debug!(error = %err, "Dataset unavailable, serving error tile");
            }
            PileError::Render(_) | PileError::Storage(_) => {
                warn!(error = %err, "Tile failed, serving error tile");
            }
        }
    }

    fn error_tile(&self, format: TileFormat) -> TileResponse {
        TileResponse {
            blob: self.placeholders.error(format),
            outcome: TileOutcome::Error,
        }
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            telemetry: self.metrics.snapshot(),
            coordinator: self.coordinator.stats(),
            cache_entries: self.cache.entry_count(),
            cache_bytes: self.cache.size_bytes(),
        }
    }

    pub fn coordinator(&self) -> &Arc<RenderCoordinator> {
        &self.coordinator
    }
}

/// Best guess at the format of an unparsable request, for its error tile.
fn requested_format(segments: &[&str]) -> TileFormat {
    segments
        .last()
        .and_then(|file| file.rsplit_once('.'))
        .and_then(|(_, ext)| ext.parse().ok())
        .unwrap_or(TileFormat::Png)
}
