//! Rendering boundary.
//!
//! A [`RenderSpec`] describes one tile completely. [`RenderPipeline`] runs the
//! two external stages, [`StyleCompiler`] then [`Renderer`], and maps every
//! failure to [`RenderError`].

mod engine;
mod error;
mod passthrough;
mod pipeline;
mod spec;

pub use engine::{CompiledStyle, RenderedTile, Renderer, StyleCompiler};
pub use error::RenderError;
pub use passthrough::{PassthroughStyleCompiler, FALLBACK_STYLE, STYLESHEET_ID};
pub use pipeline::RenderPipeline;
pub use spec::{
    ConnectionParams, Datasource, LayerBinding, RenderSpec, BUFFER_SIZE, GRID_FIELDS, LAYER_NAME,
    TILE_SIZE,
};
