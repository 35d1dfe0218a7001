use std::sync::Arc;

use tracing::debug;

use super::{RenderError, RenderSpec, Renderer, StyleCompiler};
use crate::tile::TileBlob;

/// Compile then render, as two typed stages.
///
/// The compiled style is scoped to one call. Nothing is reused between
/// attempts, so a retry always starts from the spec it is given.
#[derive(Clone)]
pub struct RenderPipeline {
    compiler: Arc<dyn StyleCompiler>,
    renderer: Arc<dyn Renderer>,
}

impl RenderPipeline {
    pub fn new(compiler: Arc<dyn StyleCompiler>, renderer: Arc<dyn Renderer>) -> Self {
        Self { compiler, renderer }
    }

    pub async fn run(&self, spec: &RenderSpec) -> Result<TileBlob, RenderError> {
        let binding = spec.layer_binding();
        let style = self.compiler.compile(&spec.style, &binding).await?;
        debug!(zoom = spec.z, bytes = style.document.len(), "Style compiled");

        let rendered = self.renderer.render(spec, &style).await?;
        if rendered.bytes.is_empty() {
            return Err(RenderError::Engine("renderer returned no bytes".into()));
        }
        if rendered.content_type != spec.format.content_type() {
            debug!(
                expected = spec.format.content_type(),
                actual = %rendered.content_type,
                "Renderer content type differs from requested format"
            );
        }

        Ok(TileBlob::new(rendered.bytes, spec.format))
    }
}
