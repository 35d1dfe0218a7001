//! Geospatial projection module
//!
//! Converts slippy-map tile addresses to projected envelopes and moves points
//! between geographic degrees and mercator meters. Tile envelopes use the
//! spherical web-mercator grid; point projection runs on the WGS84 ellipsoid.

mod geojson;
mod types;

pub use geojson::geojson_extent;
pub use types::{CoordError, Envelope, GeoBounds, TileCoord, MAX_PROJECTED_LAT, MAX_ZOOM};

use std::f64::consts::{FRAC_PI_2, PI};

/// WGS84 equatorial radius in meters.
pub const R_MAJOR: f64 = 6_378_137.0;

/// WGS84 polar radius in meters.
pub const R_MINOR: f64 = 6_356_752.314_245_179;

/// Half the width of the web-mercator plane in meters.
pub const ORIGIN_SHIFT: f64 = PI * R_MAJOR;

/// EPSG:3857 as a proj4 definition.
pub const MERCATOR_PROJ4: &str = "+proj=merc +a=6378137 +b=6378137 +lat_ts=0.0 +lon_0=0.0 \
+x_0=0.0 +y_0=0.0 +k=1.0 +units=m +nadgrids=@null +wktext +no_defs +over";

const INVERSE_TOLERANCE: f64 = 1e-10;
const INVERSE_MAX_ITERATIONS: u32 = 15;

/// Converts a tile address to its envelope in projected meters.
///
/// # Arguments
///
/// * `tile` - A validated tile coordinate
///
/// # Returns
///
/// The `(west, south, east, north)` envelope of the tile.
#[inline]
pub fn tile_to_envelope(tile: &TileCoord) -> Envelope {
    let size = 2.0 * ORIGIN_SHIFT / TileCoord::tiles_per_axis(tile.z) as f64;
    let west = tile.x as f64 * size - ORIGIN_SHIFT;
    let north = ORIGIN_SHIFT - tile.y as f64 * size;
    Envelope::new(west, north - size, west + size, north)
}

#[inline]
fn eccentricity() -> f64 {
    let ratio = R_MINOR / R_MAJOR;
    (1.0 - ratio * ratio).sqrt()
}

/// Projects longitude/latitude in degrees to ellipsoidal mercator meters.
///
/// Latitude is clamped to `±89.5°` first; the projection diverges at the poles.
pub fn lon_lat_to_meters(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_PROJECTED_LAT, MAX_PROJECTED_LAT);
    let e = eccentricity();

    let x = R_MAJOR * lon.to_radians();

    let phi = lat.to_radians();
    let con = e * phi.sin();
    let con = ((1.0 - con) / (1.0 + con)).powf(0.5 * e);
    let ts = (0.5 * (FRAC_PI_2 - phi)).tan() / con;
    let y = -R_MAJOR * ts.ln();

    (x, y)
}

/// Inverse of [`lon_lat_to_meters`].
///
/// Latitude is recovered by fixed-point iteration. When the iteration does not
/// settle within the cap, the last estimate is returned.
pub fn meters_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / R_MAJOR).to_degrees();
    let lat = inverse_latitude((-y / R_MAJOR).exp(), eccentricity()).to_degrees();
    (lon, lat)
}

fn inverse_latitude(ts: f64, e: f64) -> f64 {
    let half_e = 0.5 * e;
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();

    for _ in 0..INVERSE_MAX_ITERATIONS {
        let con = e * phi.sin();
        let dphi = FRAC_PI_2 - 2.0 * (ts * ((1.0 - con) / (1.0 + con)).powf(half_e)).atan() - phi;
        phi += dphi;
        if dphi.abs() <= INVERSE_TOLERANCE {
            break;
        }
    }

    phi
}

/// Returns true when `tile` and `data` cannot intersect.
///
/// Touching edges count as intersecting.
#[inline]
pub fn envelope_outside(tile: &Envelope, data: &Envelope) -> bool {
    tile.north < data.south
        || tile.east < data.west
        || tile.south > data.north
        || tile.west > data.east
}
