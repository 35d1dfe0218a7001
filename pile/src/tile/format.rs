use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Encoded tile output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    /// Raster image
    Png,
    /// Mapbox vector tile
    Pbf,
    /// UTFGrid interactivity grid
    Grid,
}

impl TileFormat {
    /// File extension used in tile URLs and cache keys.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Pbf => "pbf",
            TileFormat::Grid => "grid",
        }
    }

    /// HTTP content type of the encoded bytes.
    pub fn content_type(&self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Pbf => "application/x-protobuf",
            TileFormat::Grid => "application/json",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Extension that does not name a tile format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown tile format '{}' (expected png, pbf or grid)", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for TileFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(TileFormat::Png),
            "pbf" | "mvt" => Ok(TileFormat::Pbf),
            "grid" | "json" => Ok(TileFormat::Grid),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}
