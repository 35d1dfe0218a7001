//! Tile request resolution.
//!
//! Turns raw path segments into a [`TileRequest`], then looks up the owner's
//! metadata to produce the cache key and render target. Validation failures
//! and unknown owners never reach the cache or the coordinator.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::coord::{CoordError, TileCoord};
use crate::error::{codes, PileError};
use crate::metadata::{
    ingestion_error, Cube, Dataset, IngestionStatusSource, Layer, MetadataStore, Readiness,
};
use crate::tile::{CacheKey, OwnerKind, StyleHash, TileFormat, TileRequest, UnknownFormat};

/// Malformed tile path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Missing {0} in tile path")]
    MissingSegment(&'static str),

    #[error("Invalid {field} '{value}' in tile path")]
    InvalidNumber { field: &'static str, value: String },

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Format(#[from] UnknownFormat),

    #[error("{kind} tiles are not available as {format}")]
    UnsupportedFormat { kind: OwnerKind, format: TileFormat },
}

impl From<ResolveError> for PileError {
    fn from(err: ResolveError) -> Self {
        PileError::validation(codes::INVALID_TILE, err.to_string())
    }
}

/// What a resolved tile is rendered from.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderTarget {
    Layer(Layer),
    Cube { cube: Cube, dataset: Dataset },
}

/// A request with its cache key and the metadata needed to render it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTile {
    pub request: TileRequest,
    pub key: CacheKey,
    pub target: RenderTarget,
}

fn segment<'a>(value: Option<&&'a str>, name: &'static str) -> Result<&'a str, ResolveError> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or(ResolveError::MissingSegment(name))
}

fn number<T: std::str::FromStr>(value: &str, field: &'static str) -> Result<T, ResolveError> {
    value.parse().map_err(|_| ResolveError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Parses `z`, `x` and the `{y}.{ext}` file segment.
fn parse_position(z: &str, x: &str, file: &str) -> Result<(TileCoord, TileFormat), ResolveError> {
    let (y, ext) = file
        .rsplit_once('.')
        .ok_or(ResolveError::MissingSegment("format extension"))?;

    let z: u8 = number(z, "zoom")?;
    let x: u32 = number(x, "column")?;
    let y: u32 = number(y, "row")?;
    let format: TileFormat = ext.parse()?;

    Ok((TileCoord::new(z, x, y)?, format))
}

pub struct TileResolver {
    store: Arc<dyn MetadataStore>,
    ingestion: Arc<dyn IngestionStatusSource>,
}

impl TileResolver {
    pub fn new(store: Arc<dyn MetadataStore>, ingestion: Arc<dyn IngestionStatusSource>) -> Self {
        Self { store, ingestion }
    }

    /// Parses path segments into a request.
    ///
    /// Layers take `[layer_id, z, x, "{y}.{png|pbf|grid}"]`, cubes take
    /// `[cube_id, dataset_id, z, x, "{y}.png"]`.
    pub fn parse(kind: OwnerKind, segments: &[&str]) -> Result<TileRequest, ResolveError> {
        match kind {
            OwnerKind::Layer => {
                let layer_id = segment(segments.first(), "layer id")?;
                let (coord, format) = parse_position(
                    segment(segments.get(1), "zoom")?,
                    segment(segments.get(2), "column")?,
                    segment(segments.get(3), "row")?,
                )?;
                Ok(TileRequest::layer(layer_id, coord, format))
            }
            OwnerKind::Cube => {
                let cube_id = segment(segments.first(), "cube id")?;
                let dataset_id = segment(segments.get(1), "dataset id")?;
                let (coord, format) = parse_position(
                    segment(segments.get(2), "zoom")?,
                    segment(segments.get(3), "column")?,
                    segment(segments.get(4), "row")?,
                )?;
                if format != TileFormat::Png {
                    return Err(ResolveError::UnsupportedFormat { kind, format });
                }
                Ok(TileRequest::cube(cube_id, dataset_id, coord, format))
            }
        }
    }

    /// Reads the owner's metadata and builds the cache key from its current
    /// style.
    #[instrument(skip(self, request), fields(tile = %request))]
    pub async fn resolve(&self, request: TileRequest) -> Result<ResolvedTile, PileError> {
        match request.kind {
            OwnerKind::Layer => self.resolve_layer(request).await,
            OwnerKind::Cube => self.resolve_cube(request).await,
        }
    }

    async fn resolve_layer(&self, request: TileRequest) -> Result<ResolvedTile, PileError> {
        let layer = self
            .store
            .layer(&request.owner_id)
            .await?
            .ok_or_else(|| PileError::not_found(format!("No such layer: {}", request.owner_id)))?;

        // the renderer interprets the style per its version, so both pick the tile
        let key = CacheKey::for_request(
            &request,
            StyleHash::with_variant(&layer.cartocss, &layer.cartocss_version),
        );
        Ok(ResolvedTile {
            request,
            key,
            target: RenderTarget::Layer(layer),
        })
    }

    async fn resolve_cube(&self, request: TileRequest) -> Result<ResolvedTile, PileError> {
        let dataset_id = request
            .dataset_id
            .clone()
            .ok_or(ResolveError::MissingSegment("dataset id"))?;

        let (cube, status) = tokio::join!(
            self.store.cube(&request.owner_id),
            self.ingestion.status(&dataset_id)
        );

        let cube =
            cube?.ok_or_else(|| PileError::not_found(format!("No such cube: {}", request.owner_id)))?;
        if !cube.contains_dataset(&dataset_id) {
            return Err(PileError::not_found(format!(
                "Dataset {} is not part of cube {}",
                dataset_id, cube.cube_id
            )));
        }

        let status = status.map_err(|e| ingestion_error(&dataset_id, e))?;
        match status.readiness() {
            Readiness::Ready => {}
            Readiness::NotUploaded => {
                return Err(PileError::upstream(format!("Dataset {} was not uploaded", dataset_id)))
            }
            Readiness::NotProcessed => {
                return Err(PileError::upstream(format!(
                    "Dataset {} is still processing",
                    dataset_id
                )))
            }
            Readiness::Failed(message) => {
                return Err(PileError::upstream(format!(
                    "Dataset {} failed processing: {}",
                    dataset_id, message
                )))
            }
        }
        let dataset = status.dataset().ok_or_else(|| {
            PileError::upstream(format!("Ingestion status of {} names no table", dataset_id))
        })?;

        debug!(cube = %cube.cube_id, table = %dataset.table_name, "Cube tile resolved");
        let key = CacheKey::for_request(&request, StyleHash::with_variant(&cube.style, &cube.quality));
        Ok(ResolvedTile {
            request,
            key,
            target: RenderTarget::Cube { cube, dataset },
        })
    }
}
