//! Fully resolved renderer input.
//!
//! A `RenderSpec` is built from scratch for every render attempt and handed
//! to the pipeline by value. Nothing in it is shared with other attempts.

use std::fmt;

use serde::Serialize;

use crate::coord::Envelope;
use crate::tile::TileFormat;

/// Output width and height in pixels.
pub const TILE_SIZE: u32 = 256;

/// Pixels rendered beyond each tile edge so labels and strokes line up.
pub const BUFFER_SIZE: u32 = 128;

/// Name of the single map layer every stylesheet targets.
pub const LAYER_NAME: &str = "layer";

/// Attributes exposed in interactivity grids.
pub const GRID_FIELDS: &[&str] = &["gid"];

/// Credentials and host of the spatial store.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionParams {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the renderer reads geometry from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Datasource {
    /// Vector geometry selected by a SQL subquery.
    Postgis {
        #[serde(flatten)]
        connection: ConnectionParams,
        dbname: String,
        table: String,
        geometry_field: String,
        srid: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        extent: Option<[f64; 4]>,
    },

    /// Raster tiles stored in a PostGIS raster table.
    Pgraster {
        #[serde(flatten)]
        connection: ConnectionParams,
        dbname: String,
        table: String,
        band: u32,
        geometry_field: String,
        srid: u32,
        use_overviews: bool,
        clip_rasters: bool,
        prescale_rasters: bool,
        #[serde(rename = "async")]
        asynchronous: bool,
        max_async_connection: u32,
    },
}

/// The layer a stylesheet is bound to during compilation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerBinding {
    pub name: String,
    pub srs: String,
    pub datasource: Datasource,
}

/// Everything the renderer needs for one tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSpec {
    pub z: u8,
    /// `[west, south, east, north]` in projected meters.
    pub bbox: [f64; 4],
    pub width: u32,
    pub height: u32,
    pub buffer_size: u32,
    pub srs: String,
    pub style: String,
    pub style_version: String,
    pub layer_name: String,
    pub datasource: Datasource,
    pub format: TileFormat,
    /// Encoder setting such as `png8` or `png32`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interactivity_fields: Vec<String>,
}

impl RenderSpec {
    pub fn envelope(&self) -> Envelope {
        let [west, south, east, north] = self.bbox;
        Envelope::new(west, south, east, north)
    }

    pub fn layer_binding(&self) -> LayerBinding {
        LayerBinding {
            name: self.layer_name.clone(),
            srs: self.srs.clone(),
            datasource: self.datasource.clone(),
        }
    }
}
