//! Render spec assembly and extent culling.

use std::env;

use tracing::trace;

use crate::coord::{envelope_outside, tile_to_envelope, Envelope, MERCATOR_PROJ4};
use crate::render::{
    ConnectionParams, Datasource, RenderSpec, BUFFER_SIZE, FALLBACK_STYLE, GRID_FIELDS,
    LAYER_NAME, TILE_SIZE,
};
use crate::resolver::{RenderTarget, ResolvedTile};
use crate::tile::TileFormat;

/// Overrides the spatial store user name.
pub const USERNAME_ENV: &str = "PILE_PGSQL_USERNAME";

/// Overrides the spatial store password.
pub const PASSWORD_ENV: &str = "PILE_PGSQL_PASSWORD";

/// Raster band rendered for cube datasets.
pub const RASTER_BAND: u32 = 1;

/// Connection cap of the asynchronous raster datasource.
pub const MAX_ASYNC_CONNECTIONS: u32 = 10;

impl ConnectionParams {
    /// Replaces user and password with the environment overrides, when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(user) = env::var(USERNAME_ENV) {
            if !user.is_empty() {
                self.user = user;
            }
        }
        if let Ok(password) = env::var(PASSWORD_ENV) {
            if !password.is_empty() {
                self.password = password;
            }
        }
        self
    }
}

/// Builds render specs from resolved tiles.
#[derive(Debug, Clone)]
pub struct Compositor {
    connection: ConnectionParams,
}

impl Compositor {
    pub fn new(connection: ConnectionParams) -> Self {
        Self { connection }
    }

    /// Projected extent of the data behind the tile, if known.
    pub fn data_extent(tile: &ResolvedTile) -> Option<Envelope> {
        match &tile.target {
            RenderTarget::Layer(layer) => layer.extent,
            RenderTarget::Cube { dataset, .. } => dataset.extent.map(|b| b.to_envelope()),
        }
    }

    /// True when the tile lies entirely outside the data extent. Tiles of
    /// data without a known extent are never culled.
    pub fn is_outside_extent(&self, tile: &ResolvedTile) -> bool {
        let Some(data) = Self::data_extent(tile) else {
            return false;
        };
        let bounds = tile_to_envelope(&tile.request.coord);
        let outside = envelope_outside(&bounds, &data);
        if outside {
            trace!(tile = %tile.request, "Tile outside data extent");
        }
        outside
    }

    /// A fresh spec for one render attempt.
    pub fn build_spec(&self, tile: &ResolvedTile) -> RenderSpec {
        let coord = tile.request.coord;
        let format = tile.request.format;

        let (style, style_version, datasource, quality) = match &tile.target {
            RenderTarget::Layer(layer) => (
                layer.cartocss.clone(),
                layer.cartocss_version.clone(),
                Datasource::Postgis {
                    connection: self.connection.clone(),
                    dbname: layer.database_name.clone(),
                    table: layer.sql.clone(),
                    geometry_field: layer.geom_column.clone(),
                    srid: layer.srid,
                    extent: layer.extent.map(|e| e.to_array()),
                },
                None,
            ),
            RenderTarget::Cube { cube, dataset } => (
                cube.style.clone(),
                crate::metadata::DEFAULT_CARTOCSS_VERSION.to_string(),
                Datasource::Pgraster {
                    connection: self.connection.clone(),
                    dbname: dataset.database_name.clone(),
                    table: dataset.table_name.clone(),
                    band: RASTER_BAND,
                    geometry_field: dataset.geometry_column.clone(),
                    srid: dataset.srid,
                    use_overviews: true,
                    clip_rasters: true,
                    prescale_rasters: true,
                    asynchronous: true,
                    max_async_connection: MAX_ASYNC_CONNECTIONS,
                },
                Some(cube.quality.clone()),
            ),
        };

        let style = if style.trim().is_empty() {
            FALLBACK_STYLE.to_string()
        } else {
            style
        };

        let interactivity_fields = if format == TileFormat::Grid {
            GRID_FIELDS.iter().map(|f| f.to_string()).collect()
        } else {
            Vec::new()
        };

        RenderSpec {
            z: coord.z,
            bbox: tile_to_envelope(&coord).to_array(),
            width: TILE_SIZE,
            height: TILE_SIZE,
            buffer_size: BUFFER_SIZE,
            srs: MERCATOR_PROJ4.to_string(),
            style,
            style_version,
            layer_name: LAYER_NAME.to_string(),
            datasource,
            format,
            quality,
            interactivity_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{GeoBounds, TileCoord};
    use crate::metadata::{Cube, Dataset, DatasetRef, Layer};
    use crate::tile::{CacheKey, StyleHash, TileRequest};
    use serde_json::Map;

    fn compositor() -> Compositor {
        Compositor::new(ConnectionParams {
            host: "postgis".into(),
            user: "docker".into(),
            password: "docker".into(),
        })
    }

    fn cube_tile(coord: TileCoord, extent: Option<GeoBounds>) -> ResolvedTile {
        let request = TileRequest::cube("cube-1", "file_a", coord, TileFormat::Png);
        let cube = Cube {
            cube_id: "cube-1".into(),
            style: "#layer { raster-opacity: 1; }".into(),
            quality: "png8".into(),
            datasets: vec![DatasetRef::new("file_a")],
            created_at: 0,
            timestamp: 0,
            created_by: None,
            options: Map::new(),
        };
        ResolvedTile {
            key: CacheKey::for_request(&request, StyleHash::with_variant(&cube.style, &cube.quality)),
            request,
            target: RenderTarget::Cube {
                cube,
                dataset: Dataset {
                    file_id: "file_a".into(),
                    database_name: "vkt".into(),
                    table_name: "file_a".into(),
                    extent,
                    geometry_column: "rast".into(),
                    srid: 3857,
                },
            },
        }
    }

    fn layer_tile(coord: TileCoord, format: TileFormat, cartocss: &str) -> ResolvedTile {
        let request = TileRequest::layer("L", coord, format);
        ResolvedTile {
            key: CacheKey::for_request(&request, StyleHash::with_variant(cartocss, "2.0.1")),
            request,
            target: RenderTarget::Layer(Layer {
                layer_id: "L".into(),
                file_id: "file_b".into(),
                database_name: "vkt".into(),
                table_name: "file_b".into(),
                sql: "(SELECT * FROM file_b) as sub".into(),
                cartocss: cartocss.into(),
                cartocss_version: "2.0.1".into(),
                geom_column: "geom".into(),
                geom_type: "geometry".into(),
                raster_band: 0,
                srid: 3857,
                extent: None,
                created_at: 0,
                timestamp: 0,
            }),
        }
    }

    const TEN_TO_TWENTY: GeoBounds = GeoBounds {
        min_lon: 10.0,
        min_lat: 10.0,
        max_lon: 20.0,
        max_lat: 20.0,
    };

    #[test]
    fn test_equator_tile_outside_extent() {
        // z=8 tile 128/128 starts at lon 0, lat 0 and spans about 1.4 degrees
        let tile = cube_tile(TileCoord::new(8, 128, 127).unwrap(), Some(TEN_TO_TWENTY));
        assert!(compositor().is_outside_extent(&tile));
    }

    #[test]
    fn test_tile_inside_extent_is_rendered() {
        let tile = cube_tile(TileCoord::new(2, 2, 1).unwrap(), Some(TEN_TO_TWENTY));
        assert!(!compositor().is_outside_extent(&tile));
    }

    #[test]
    fn test_missing_extent_never_culls() {
        let tile = cube_tile(TileCoord::new(8, 0, 0).unwrap(), None);
        assert!(!compositor().is_outside_extent(&tile));
    }

    #[test]
    fn test_cube_spec_uses_raster_datasource() {
        let tile = cube_tile(TileCoord::new(2, 2, 1).unwrap(), Some(TEN_TO_TWENTY));
        let spec = compositor().build_spec(&tile);

        assert_eq!(spec.width, 256);
        assert_eq!(spec.buffer_size, 128);
        assert_eq!(spec.layer_name, "layer");
        assert_eq!(spec.quality.as_deref(), Some("png8"));
        match spec.datasource {
            Datasource::Pgraster {
                band,
                max_async_connection,
                ref geometry_field,
                ref table,
                ..
            } => {
                assert_eq!(band, 1);
                assert_eq!(max_async_connection, 10);
                assert_eq!(geometry_field, "rast");
                assert_eq!(table, "file_a");
            }
            other => panic!("expected raster datasource, got {other:?}"),
        }
    }

    #[test]
    fn test_layer_spec_uses_sql_and_fallback_style() {
        let tile = layer_tile(TileCoord::new(10, 511, 340).unwrap(), TileFormat::Grid, "");
        let spec = compositor().build_spec(&tile);

        assert_eq!(spec.style, FALLBACK_STYLE);
        assert_eq!(spec.interactivity_fields, vec!["gid".to_string()]);
        assert_eq!(spec.bbox, tile_to_envelope(&tile.request.coord).to_array());
        assert!(matches!(
            spec.datasource,
            Datasource::Postgis { ref table, .. } if table == "(SELECT * FROM file_b) as sub"
        ));
    }
}
