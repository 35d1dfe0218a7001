//! Shared collaborators for the integration tests.
//!
//! Every mock records what it was asked so tests can assert on renderer
//! invocations and cache writes instead of timing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Semaphore;

use pile::cache::{BoxFuture, Cache, GcResult, MemoryCacheProvider, ServiceCacheError, TileCacheClient};
use pile::compositor::Compositor;
use pile::coord::TileCoord;
use pile::coordinator::{CoordinatorConfig, RenderCoordinator, RetryPolicy};
use pile::metadata::{
    CubeService, IngestionError, IngestionStatus, IngestionStatusSource, KvMetadataStore,
    LayerService, MetadataStore,
};
use pile::placeholder::PlaceholderTiles;
use pile::render::{
    CompiledStyle, ConnectionParams, Datasource, PassthroughStyleCompiler, RenderError,
    RenderPipeline, RenderSpec, RenderedTile, Renderer,
};
use pile::resolver::TileResolver;
use pile::service::TileService;
use pile::telemetry::TileMetrics;
use pile::tile::{CacheKey, StyleHash, TileFormat, TileRequest};

// ============================================================================
// Renderers
// ============================================================================

/// Renders `"{style}@{z}"` as the tile bytes and counts invocations.
///
/// The first `failures` calls fail with a datasource error. An optional
/// delay keeps renders in flight long enough for concurrent callers to join.
pub struct CountingRenderer {
    calls: AtomicUsize,
    failures: usize,
    delay: Duration,
    specs: Mutex<Vec<RenderSpec>>,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures: 0,
            delay: Duration::ZERO,
            specs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn specs(&self) -> Vec<RenderSpec> {
        self.specs.lock().clone()
    }
}

impl Renderer for CountingRenderer {
    fn render<'a>(
        &'a self,
        spec: &'a RenderSpec,
        _style: &'a CompiledStyle,
    ) -> BoxFuture<'a, Result<RenderedTile, RenderError>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.specs.lock().push(spec.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if call <= self.failures {
                return Err(RenderError::Datasource(format!("failure {}", call)));
            }
            Ok(RenderedTile {
                bytes: Bytes::from(format!("{}@{}", spec.style, spec.z)),
                content_type: spec.format.content_type().to_string(),
            })
        })
    }
}

/// Holds every render until a permit is released, and records the order
/// in which styles reached the renderer.
pub struct GateRenderer {
    gate: Semaphore,
    order: Mutex<Vec<String>>,
}

impl GateRenderer {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn release(&self, renders: usize) {
        self.gate.add_permits(renders);
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().clone()
    }
}

impl Renderer for GateRenderer {
    fn render<'a>(
        &'a self,
        spec: &'a RenderSpec,
        _style: &'a CompiledStyle,
    ) -> BoxFuture<'a, Result<RenderedTile, RenderError>> {
        Box::pin(async move {
            self.order.lock().push(spec.style.clone());
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| RenderError::Engine(e.to_string()))?;
            permit.forget();
            Ok(RenderedTile {
                bytes: Bytes::from(spec.style.clone()),
                content_type: "image/png".to_string(),
            })
        })
    }
}

/// The first call never completes; later calls succeed.
pub struct HangingRenderer {
    calls: AtomicUsize,
}

impl HangingRenderer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renderer for HangingRenderer {
    fn render<'a>(
        &'a self,
        spec: &'a RenderSpec,
        _style: &'a CompiledStyle,
    ) -> BoxFuture<'a, Result<RenderedTile, RenderError>> {
        Box::pin(async move {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok(RenderedTile {
                bytes: Bytes::from(spec.style.clone()),
                content_type: "image/png".to_string(),
            })
        })
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// In-memory ingestion service.
#[derive(Default)]
pub struct MockIngestion {
    statuses: Mutex<HashMap<String, IngestionStatus>>,
    unavailable: Mutex<bool>,
}

impl MockIngestion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processed file whose data covers `bounds`
    /// (`[min_lon, min_lat, max_lon, max_lat]`), or the whole world when
    /// `None`.
    pub fn add_ready(&self, file_id: &str, bounds: Option<[f64; 4]>) {
        let metadata = bounds.map(|[min_lon, min_lat, max_lon, max_lat]| {
            json!({
                "extent_geojson": {
                    "type": "Polygon",
                    "coordinates": [[
                        [min_lon, min_lat],
                        [max_lon, min_lat],
                        [max_lon, max_lat],
                        [min_lon, max_lat],
                        [min_lon, min_lat]
                    ]]
                },
                "srid": 3857
            })
        });
        self.insert(IngestionStatus {
            file_id: file_id.to_string(),
            upload_success: true,
            processing_success: true,
            table_name: Some(file_id.to_string()),
            database_name: Some("vkt".to_string()),
            metadata,
            ..Default::default()
        });
    }

    pub fn insert(&self, status: IngestionStatus) {
        self.statuses.lock().insert(status.file_id.clone(), status);
    }

    /// Makes every lookup fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }
}

impl IngestionStatusSource for MockIngestion {
    fn status<'a>(
        &'a self,
        file_id: &'a str,
    ) -> BoxFuture<'a, Result<IngestionStatus, IngestionError>> {
        Box::pin(async move {
            if *self.unavailable.lock() {
                return Err(IngestionError::Unavailable("connection refused".to_string()));
            }
            self.statuses
                .lock()
                .get(file_id)
                .cloned()
                .ok_or_else(|| IngestionError::UnknownFile(file_id.to_string()))
        })
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Memory cache that counts reads and writes.
pub struct CountingCache {
    inner: MemoryCacheProvider,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCacheProvider::new(64 * 1024 * 1024, None),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Cache for CountingCache {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        self.inner.delete(key)
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        self.inner.contains(key)
    }

    fn size_bytes(&self) -> u64 {
        self.inner.size_bytes()
    }

    fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    fn max_size_bytes(&self) -> u64 {
        self.inner.max_size_bytes()
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>> {
        self.inner.gc()
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn connection() -> ConnectionParams {
    ConnectionParams {
        host: "postgis".to_string(),
        user: "docker".to_string(),
        password: "docker".to_string(),
    }
}

/// A fully wired tile service over mock collaborators.
pub struct Harness {
    pub tiles: TileService,
    pub layers: LayerService,
    pub cubes: CubeService,
    pub coordinator: Arc<RenderCoordinator>,
    pub cache: Arc<CountingCache>,
    pub ingestion: Arc<MockIngestion>,
    pub metrics: Arc<TileMetrics>,
}

impl Harness {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self::with_config(renderer, test_coordinator_config())
    }

    pub fn with_config(renderer: Arc<dyn Renderer>, config: CoordinatorConfig) -> Self {
        let metrics = Arc::new(TileMetrics::new());
        let cache = Arc::new(CountingCache::new());
        let tile_cache = Arc::new(TileCacheClient::new(
            Arc::clone(&cache) as Arc<dyn Cache>,
            Arc::clone(&metrics),
        ));

        let pipeline = RenderPipeline::new(Arc::new(PassthroughStyleCompiler::new()), renderer);
        let coordinator = Arc::new(RenderCoordinator::start(
            config,
            pipeline,
            Arc::clone(&tile_cache),
            Arc::clone(&metrics),
        ));

        let store: Arc<dyn MetadataStore> = Arc::new(KvMetadataStore::in_memory());
        let ingestion = Arc::new(MockIngestion::new());
        let ingestion_source = Arc::clone(&ingestion) as Arc<dyn IngestionStatusSource>;

        let tiles = TileService::new(
            TileResolver::new(Arc::clone(&store), Arc::clone(&ingestion_source)),
            Compositor::new(connection()),
            Arc::clone(&coordinator),
            tile_cache,
            PlaceholderTiles::new().unwrap(),
            Arc::clone(&metrics),
        );

        Self {
            tiles,
            layers: LayerService::new(Arc::clone(&store), ingestion_source),
            cubes: CubeService::new(store),
            coordinator,
            cache,
            ingestion,
            metrics,
        }
    }
}

/// Fast retries and a short liveness window.
pub fn test_coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_workers(4)
        .with_retry(RetryPolicy::fixed(5, Duration::ZERO))
        .with_render_timeout(Duration::from_secs(5))
        .with_sweep_interval(Duration::from_secs(60))
}

// ============================================================================
// Coordinator inputs
// ============================================================================

/// A layer key whose style hash is derived from `label`.
pub fn key(label: &str) -> CacheKey {
    let coord = TileCoord::new(3, 1, 2).unwrap();
    let request = TileRequest::layer(label, coord, TileFormat::Png);
    CacheKey::for_request(&request, StyleHash::of(label))
}

/// A spec whose style text is `label`, so renderers can tell jobs apart.
pub fn spec(label: &str) -> RenderSpec {
    RenderSpec {
        z: 3,
        bbox: [0.0, 0.0, 1.0, 1.0],
        width: 256,
        height: 256,
        buffer_size: 128,
        srs: "+init=epsg:3857".to_string(),
        style: label.to_string(),
        style_version: "2.0.1".to_string(),
        layer_name: "layer".to_string(),
        datasource: Datasource::Postgis {
            connection: connection(),
            dbname: "vkt".to_string(),
            table: "(SELECT * FROM t) as sub".to_string(),
            geometry_field: "geom".to_string(),
            srid: 3857,
            extent: None,
        },
        format: TileFormat::Png,
        quality: None,
        interactivity_fields: Vec::new(),
    }
}

/// Factory closure producing [`spec`] for `label`.
pub fn factory(label: &str) -> impl Fn() -> RenderSpec + Send + Sync + 'static {
    let label = label.to_string();
    move || spec(&label)
}
