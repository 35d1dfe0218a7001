//! Designated tile bodies for culled and failed tiles.

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, Rgba, RgbaImage};

use crate::render::TILE_SIZE;
use crate::tile::{TileBlob, TileFormat};

/// Body of an empty interactivity grid.
pub const EMPTY_GRID: &str = r#"{"grid":[],"keys":[""],"data":{}}"#;

/// Fill of the error tile: light grey at low opacity.
const ERROR_FILL: Rgba<u8> = Rgba([200, 200, 200, 64]);

fn encode_png(image: &RgbaImage) -> Result<Bytes, ImageError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(Bytes::from(buffer))
}

/// Pre-encoded empty and error tiles, built once at startup.
#[derive(Debug, Clone)]
pub struct PlaceholderTiles {
    empty_png: Bytes,
    error_png: Bytes,
}

impl PlaceholderTiles {
    pub fn new() -> Result<Self, ImageError> {
        let empty = RgbaImage::new(TILE_SIZE, TILE_SIZE);
        let error = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, ERROR_FILL);
        Ok(Self {
            empty_png: encode_png(&empty)?,
            error_png: encode_png(&error)?,
        })
    }

    /// A tile with nothing on it.
    pub fn empty(&self, format: TileFormat) -> TileBlob {
        match format {
            TileFormat::Png => TileBlob::new(self.empty_png.clone(), format),
            TileFormat::Pbf => TileBlob::new(Bytes::new(), format),
            TileFormat::Grid => TileBlob::new(Bytes::from_static(EMPTY_GRID.as_bytes()), format),
        }
    }

    /// The tile served when a tile cannot be produced. Vector and grid
    /// formats have no visual error state and get the empty body.
    pub fn error(&self, format: TileFormat) -> TileBlob {
        match format {
            TileFormat::Png => TileBlob::new(self.error_png.clone(), format),
            other => self.empty(other),
        }
    }
}
