//! Persisted layer and cube records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coord::{Envelope, GeoBounds};

pub const DEFAULT_CARTOCSS_VERSION: &str = "2.0.1";
pub const DEFAULT_GEOM_COLUMN: &str = "geom";
pub const DEFAULT_GEOM_TYPE: &str = "geometry";
pub const DEFAULT_RASTER_COLUMN: &str = "rast";
pub const DEFAULT_SRID: u32 = 3857;
pub const DEFAULT_CUBE_STYLE: &str = "#layer { raster-opacity: 1; }";
pub const DEFAULT_CUBE_QUALITY: &str = "png32";

/// Prefix of generated layer ids.
pub const LAYER_ID_PREFIX: &str = "layer_id-";
/// Prefix of generated cube ids.
pub const CUBE_ID_PREFIX: &str = "cube-";

fn default_srid() -> u32 {
    DEFAULT_SRID
}

fn default_raster_column() -> String {
    DEFAULT_RASTER_COLUMN.to_string()
}

/// A style bound to one ingested table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub layer_id: String,
    pub file_id: String,
    pub database_name: String,
    pub table_name: String,
    /// Query with the table placeholder already substituted.
    pub sql: String,
    pub cartocss: String,
    pub cartocss_version: String,
    pub geom_column: String,
    pub geom_type: String,
    pub raster_band: u32,
    pub srid: u32,
    /// Projected extent of the source table, when ingestion reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<Envelope>,
    pub created_at: i64,
    pub timestamp: i64,
}

/// Member of a cube: a dataset id plus whatever the client attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl DatasetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }
}

/// A style shared by an ordered list of raster datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    pub cube_id: String,
    pub style: String,
    /// PNG encoding, `png8` or `png32`.
    pub quality: String,
    #[serde(default)]
    pub datasets: Vec<DatasetRef>,
    pub created_at: i64,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Client fields the engine does not interpret.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Cube {
    pub fn contains_dataset(&self, dataset_id: &str) -> bool {
        self.datasets.iter().any(|d| d.id == dataset_id)
    }
}

/// An ingested source table as reported by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub file_id: String,
    pub database_name: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<GeoBounds>,
    #[serde(default = "default_raster_column")]
    pub geometry_column: String,
    #[serde(default = "default_srid")]
    pub srid: u32,
}
