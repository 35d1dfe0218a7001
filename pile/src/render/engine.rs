//! Boundaries to the external style compiler and rendering engine.

use bytes::Bytes;

use super::{LayerBinding, RenderError, RenderSpec};
use crate::cache::BoxFuture;

/// A stylesheet lowered into the renderer's native style language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStyle {
    pub document: String,
}

/// Encoded output of the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTile {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Turns style text plus a layer binding into a native style document.
///
/// Failures must be reported as [`RenderError::StyleCompilation`].
pub trait StyleCompiler: Send + Sync {
    fn compile<'a>(
        &'a self,
        style: &'a str,
        binding: &'a LayerBinding,
    ) -> BoxFuture<'a, Result<CompiledStyle, RenderError>>;
}

/// Renders one tile.
pub trait Renderer: Send + Sync {
    fn render<'a>(
        &'a self,
        spec: &'a RenderSpec,
        style: &'a CompiledStyle,
    ) -> BoxFuture<'a, Result<RenderedTile, RenderError>>;
}
