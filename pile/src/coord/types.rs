//! Coordinate type definitions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deepest zoom level accepted in a tile request.
pub const MAX_ZOOM: u8 = 30;

/// Latitude clamp applied before the ellipsoidal forward projection.
pub const MAX_PROJECTED_LAT: f64 = 89.5;

/// Tile address in the slippy-map scheme.
///
/// Construct through [`TileCoord::new`] so the `0 <= x, y < 2^z` invariant
/// holds for every value that reaches the cache key or the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level (0-30)
    pub z: u8,
    /// Column, 0 at the antimeridian west edge
    pub x: u32,
    /// Row, 0 at the north edge
    pub y: u32,
}

impl TileCoord {
    /// Validates and builds a tile coordinate.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        if z > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(z as u32));
        }
        let span = Self::tiles_per_axis(z);
        if u64::from(x) >= span {
            return Err(CoordError::ColumnOutOfRange { z, x });
        }
        if u64::from(y) >= span {
            return Err(CoordError::RowOutOfRange { z, y });
        }
        Ok(Self { z, x, y })
    }

    /// Number of tiles along one axis at zoom `z`.
    #[inline]
    pub fn tiles_per_axis(z: u8) -> u64 {
        1u64 << z
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Axis-aligned rectangle in projected (EPSG:3857) meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Envelope {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The envelope as `[west, south, east, north]`, the order renderers expect.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    /// Projects the south-west and north-east corners into meters.
    pub fn to_envelope(&self) -> Envelope {
        let (west, south) = super::lon_lat_to_meters(self.min_lon, self.min_lat);
        let (east, north) = super::lon_lat_to_meters(self.max_lon, self.max_lat);
        Envelope::new(west, south, east, north)
    }

    pub(crate) fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }
}

/// Errors raised while validating tile coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Zoom level is above [`MAX_ZOOM`]
    InvalidZoom(u32),
    /// Column does not exist at this zoom
    ColumnOutOfRange { z: u8, x: u32 },
    /// Row does not exist at this zoom
    RowOutOfRange { z: u8, y: u32 },
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidZoom(z) => {
                write!(f, "Invalid zoom level: {} (must be between 0 and {})", z, MAX_ZOOM)
            }
            CoordError::ColumnOutOfRange { z, x } => write!(
                f,
                "Invalid tile column: {} (must be below {} at zoom {})",
                x,
                TileCoord::tiles_per_axis(*z),
                z
            ),
            CoordError::RowOutOfRange { z, y } => write!(
                f,
                "Invalid tile row: {} (must be below {} at zoom {})",
                y,
                TileCoord::tiles_per_axis(*z),
                z
            ),
        }
    }
}

impl std::error::Error for CoordError {}
