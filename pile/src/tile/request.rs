//! Canonical tile requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TileFormat;
use crate::coord::TileCoord;

/// Kind of resource that owns the style a tile is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// Single-dataset style binding
    Layer,
    /// Multi-dataset composite
    Cube,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Layer => "layer",
            OwnerKind::Cube => "cube",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated tile request.
///
/// Produced by the resolver from raw path segments. Holding one means the
/// identifiers are non-empty and the coordinate exists at its zoom level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileRequest {
    pub kind: OwnerKind,
    pub owner_id: String,
    /// Dataset rendered within a cube; `None` for layers.
    pub dataset_id: Option<String>,
    pub coord: TileCoord,
    pub format: TileFormat,
}

impl TileRequest {
    pub fn layer(layer_id: impl Into<String>, coord: TileCoord, format: TileFormat) -> Self {
        Self {
            kind: OwnerKind::Layer,
            owner_id: layer_id.into(),
            dataset_id: None,
            coord,
            format,
        }
    }

    pub fn cube(
        cube_id: impl Into<String>,
        dataset_id: impl Into<String>,
        coord: TileCoord,
        format: TileFormat,
    ) -> Self {
        Self {
            kind: OwnerKind::Cube,
            owner_id: cube_id.into(),
            dataset_id: Some(dataset_id.into()),
            coord,
            format,
        }
    }
}

impl fmt::Display for TileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.owner_id)?;
        if let Some(dataset) = &self.dataset_id {
            write!(f, "/{}", dataset)?;
        }
        write!(f, "/{}.{}", self.coord, self.format)
    }
}
