//! Application bootstrap implementation.
//!
//! `PileApp` starts services in dependency order so that cache GC daemons
//! and the render workers are running before the first request arrives.

use std::sync::Arc;

use tracing::info;

use super::config::AppConfig;
use super::error::AppError;
use crate::cache::{CacheService, TileCacheClient};
use crate::compositor::Compositor;
use crate::coordinator::RenderCoordinator;
use crate::metadata::{
    CubeService, IngestionStatusSource, KvMetadataStore, LayerService, MetadataStore,
};
use crate::placeholder::PlaceholderTiles;
use crate::remote::{HttpIngestionStatus, HttpRenderer};
use crate::render::{PassthroughStyleCompiler, RenderPipeline, Renderer, StyleCompiler};
use crate::resolver::TileResolver;
use crate::server::{self, AppState};
use crate::service::TileService;
use crate::telemetry::TileMetrics;

/// External systems the engine talks to.
///
/// [`PileApp::start`] builds the HTTP adapters from [`AppConfig`]; tests and
/// embedders pass their own to [`PileApp::start_with`].
#[derive(Clone)]
pub struct Collaborators {
    pub compiler: Arc<dyn StyleCompiler>,
    pub renderer: Arc<dyn Renderer>,
    pub ingestion: Arc<dyn IngestionStatusSource>,
}

impl Collaborators {
    /// HTTP renderer and ingestion client, passthrough style compiler.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let renderer = HttpRenderer::new(&config.render_endpoint, config.coordinator.render_timeout)?;

        let mut ingestion = HttpIngestionStatus::new(&config.ingestion.endpoint, config.ingestion.timeout)?;
        if let Some(token) = &config.ingestion.access_token {
            ingestion = ingestion.with_access_token(token.clone());
        }

        Ok(Self {
            compiler: Arc::new(PassthroughStyleCompiler::new()),
            renderer: Arc::new(renderer),
            ingestion: Arc::new(ingestion),
        })
    }
}

/// The running engine.
///
/// Start order:
/// 1. Tile cache service (owns its GC daemon)
/// 2. Metadata cache service
/// 3. Render coordinator workers and stuck-render sweeper
/// 4. Tile and management services on top
///
/// [`shutdown`](Self::shutdown) stops them in reverse.
pub struct PileApp {
    tile_cache_service: CacheService,
    metadata_cache_service: CacheService,
    coordinator: Arc<RenderCoordinator>,
    tiles: Arc<TileService>,
    layers: Arc<LayerService>,
    cubes: Arc<CubeService>,
    metrics: Arc<TileMetrics>,
    config: AppConfig,
}

impl PileApp {
    /// Starts the application with the HTTP collaborators named in `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let collaborators = Collaborators::from_config(&config)?;
        Self::start_with(config, collaborators).await
    }

    pub async fn start_with(
        config: AppConfig,
        collaborators: Collaborators,
    ) -> Result<Self, AppError> {
        info!("Starting pile");

        let tile_cache_service = CacheService::start(config.tile_cache.clone())
            .await
            .map_err(AppError::TileCacheStart)?;
        info!(
            backend = tile_cache_service.backend(),
            max_size_bytes = config.tile_cache.max_size_bytes,
            "Tile cache service started"
        );

        let metadata_cache_service = CacheService::start(config.metadata_cache.clone())
            .await
            .map_err(AppError::MetadataCacheStart)?;
        info!(
            backend = metadata_cache_service.backend(),
            "Metadata cache service started"
        );

        let metrics = Arc::new(TileMetrics::new());
        let tile_cache = Arc::new(TileCacheClient::new(
            tile_cache_service.cache(),
            Arc::clone(&metrics),
        ));

        let pipeline = RenderPipeline::new(collaborators.compiler, collaborators.renderer);
        let coordinator = Arc::new(RenderCoordinator::start(
            config.coordinator.clone(),
            pipeline,
            Arc::clone(&tile_cache),
            Arc::clone(&metrics),
        ));

        let store: Arc<dyn MetadataStore> =
            Arc::new(KvMetadataStore::new(metadata_cache_service.cache()));
        let placeholders =
            PlaceholderTiles::new().map_err(|e| AppError::Placeholder(e.to_string()))?;

        let tiles = Arc::new(TileService::new(
            TileResolver::new(Arc::clone(&store), Arc::clone(&collaborators.ingestion)),
            Compositor::new(config.connection.clone().with_env_overrides()),
            Arc::clone(&coordinator),
            tile_cache,
            placeholders,
            Arc::clone(&metrics),
        ));
        let layers = Arc::new(LayerService::new(
            Arc::clone(&store),
            collaborators.ingestion,
        ));
        let cubes = Arc::new(CubeService::new(store));

        info!(listen = %config.listen, "Pile started");

        Ok(Self {
            tile_cache_service,
            metadata_cache_service,
            coordinator,
            tiles,
            layers,
            cubes,
            metrics,
            config,
        })
    }

    pub fn tiles(&self) -> Arc<TileService> {
        Arc::clone(&self.tiles)
    }

    pub fn layers(&self) -> Arc<LayerService> {
        Arc::clone(&self.layers)
    }

    pub fn cubes(&self) -> Arc<CubeService> {
        Arc::clone(&self.cubes)
    }

    pub fn metrics(&self) -> Arc<TileMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// HTTP API over this app's services.
    pub fn router(&self) -> axum::Router {
        server::router(AppState {
            tiles: self.tiles(),
            layers: self.layers(),
            cubes: self.cubes(),
        })
    }

    /// Stops the render workers, then the caches.
    ///
    /// Renders still queued fail with a shutdown error.
    pub async fn shutdown(self) {
        info!("Shutting down pile");

        self.coordinator.shutdown().await;
        info!("Render coordinator shut down");

        self.metadata_cache_service.shutdown().await;
        self.tile_cache_service.shutdown().await;
        info!("Cache services shut down");
    }
}
