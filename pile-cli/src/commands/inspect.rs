//! Offline helpers: tile envelopes and cache keys.

use clap::ValueEnum;
use pile::coord::{meters_to_lon_lat, tile_to_envelope, TileCoord};
use pile::tile::{CacheKey, StyleHash, TileFormat, TileRequest};

use crate::error::CliError;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Png,
    Pbf,
    Grid,
}

impl From<FormatArg> for TileFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Png => TileFormat::Png,
            FormatArg::Pbf => TileFormat::Pbf,
            FormatArg::Grid => TileFormat::Grid,
        }
    }
}

/// Prints the projected envelope of a tile and its corners in degrees.
pub fn envelope(z: u8, x: u32, y: u32) -> Result<(), CliError> {
    let coord = TileCoord::new(z, x, y)?;
    let envelope = tile_to_envelope(&coord);
    let (west, south) = meters_to_lon_lat(envelope.west, envelope.south);
    let (east, north) = meters_to_lon_lat(envelope.east, envelope.north);

    println!("Tile {}", coord);
    println!(
        "  Meters:  west={:.3} south={:.3} east={:.3} north={:.3}",
        envelope.west, envelope.south, envelope.east, envelope.north
    );
    println!(
        "  Degrees: west={:.6} south={:.6} east={:.6} north={:.6}",
        west, south, east, north
    );
    Ok(())
}

/// Arguments of `pile key`.
#[derive(Debug, Clone)]
pub struct KeyArgs {
    pub owner: String,
    /// Set for cube tiles.
    pub dataset: Option<String>,
    pub style: String,
    /// Style language version of a layer.
    pub style_version: Option<String>,
    pub quality: Option<String>,
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub format: FormatArg,
}

/// The cache key a tile is stored under for the given style.
pub fn cache_key(args: KeyArgs) -> Result<CacheKey, CliError> {
    let coord = TileCoord::new(args.z, args.x, args.y)?;

    Ok(match args.dataset {
        Some(dataset) => {
            let quality = args
                .quality
                .as_deref()
                .unwrap_or(pile::metadata::DEFAULT_CUBE_QUALITY);
            let request = TileRequest::cube(args.owner, dataset, coord, TileFormat::Png);
            CacheKey::for_request(&request, StyleHash::with_variant(&args.style, quality))
        }
        None => {
            let version = args
                .style_version
                .as_deref()
                .unwrap_or(pile::metadata::DEFAULT_CARTOCSS_VERSION);
            let request = TileRequest::layer(args.owner, coord, args.format.into());
            CacheKey::for_request(&request, StyleHash::with_variant(&args.style, version))
        }
    })
}

pub fn key(args: KeyArgs) -> Result<(), CliError> {
    println!("{}", cache_key(args)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_args() -> KeyArgs {
        KeyArgs {
            owner: "L".to_string(),
            dataset: None,
            style: "#layer { line-color: red; }".to_string(),
            style_version: None,
            quality: None,
            z: 10,
            x: 511,
            y: 340,
            format: FormatArg::Png,
        }
    }

    #[test]
    fn test_layer_key_shape() {
        let key = cache_key(layer_args()).unwrap().to_string();
        let hash = StyleHash::with_variant("#layer { line-color: red; }", "2.0.1");
        assert_eq!(key, format!("layer:L:{}:10:511:340:png", hash));
    }

    #[test]
    fn test_layer_key_depends_on_style_version() {
        let default = cache_key(layer_args()).unwrap();

        let mut args = layer_args();
        args.style_version = Some("3.0.0".to_string());
        let newer = cache_key(args).unwrap();

        assert_ne!(default, newer);
    }

    #[test]
    fn test_cube_key_depends_on_quality() {
        let mut args = layer_args();
        args.dataset = Some("d1".to_string());
        let png32 = cache_key(args.clone()).unwrap();

        args.quality = Some("png8".to_string());
        let png8 = cache_key(args).unwrap();

        assert_ne!(png32, png8);
    }

    #[test]
    fn test_out_of_range_tile_rejected() {
        let mut args = layer_args();
        args.x = 1024;
        assert!(matches!(cache_key(args), Err(CliError::InvalidTile(_))));
    }
}
