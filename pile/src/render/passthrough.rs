//! Style compiler that defers real compilation to the renderer.

use serde_json::json;

use super::{CompiledStyle, LayerBinding, RenderError, StyleCompiler};
use crate::cache::BoxFuture;

/// Stylesheet used when a layer or cube has no style text.
pub const FALLBACK_STYLE: &str = "#layer {}";

/// Identifier of the single stylesheet in every compiled document.
pub const STYLESHEET_ID: &str = "tile_style";

/// Wraps the stylesheet and its layer binding into one JSON document.
///
/// Only checks that braces balance. The downstream renderer parses the
/// stylesheet itself.
#[derive(Debug, Default, Clone)]
pub struct PassthroughStyleCompiler;

impl PassthroughStyleCompiler {
    pub fn new() -> Self {
        Self
    }
}

fn check_braces(style: &str) -> Result<(), RenderError> {
    let mut depth: i64 = 0;
    for (line_no, line) in style.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(RenderError::StyleCompilation(format!(
                            "unexpected '}}' on line {}",
                            line_no + 1
                        )));
                    }
                }
                _ => {}
            }
        }
    }
    if depth != 0 {
        return Err(RenderError::StyleCompilation(format!(
            "{} unclosed block(s)",
            depth
        )));
    }
    Ok(())
}

impl StyleCompiler for PassthroughStyleCompiler {
    fn compile<'a>(
        &'a self,
        style: &'a str,
        binding: &'a LayerBinding,
    ) -> BoxFuture<'a, Result<CompiledStyle, RenderError>> {
        Box::pin(async move {
            let style = if style.trim().is_empty() {
                FALLBACK_STYLE
            } else {
                style
            };
            check_braces(style)?;

            let document = json!({
                "srs": binding.srs,
                "Stylesheet": [{ "id": STYLESHEET_ID, "data": style }],
                "Layer": [{
                    "id": binding.name,
                    "name": binding.name,
                    "srs": binding.srs,
                    "Datasource": binding.datasource,
                }],
            });

            Ok(CompiledStyle {
                document: document.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{ConnectionParams, Datasource};

    fn binding() -> LayerBinding {
        LayerBinding {
            name: "layer".into(),
            srs: "+init=epsg:3857".into(),
            datasource: Datasource::Postgis {
                connection: ConnectionParams {
                    host: "h".into(),
                    user: "u".into(),
                    password: "p".into(),
                },
                dbname: "db".into(),
                table: "t".into(),
                geometry_field: "geom".into(),
                srid: 3857,
                extent: None,
            },
        }
    }

    #[tokio::test]
    async fn test_empty_style_falls_back() {
        let compiled = PassthroughStyleCompiler::new()
            .compile("  ", &binding())
            .await
            .unwrap();
        let doc: serde_json::Value = serde_json::from_str(&compiled.document).unwrap();
        assert_eq!(doc["Stylesheet"][0]["data"], FALLBACK_STYLE);
        assert_eq!(doc["Stylesheet"][0]["id"], STYLESHEET_ID);
        assert_eq!(doc["Layer"][0]["name"], "layer");
    }

    #[tokio::test]
    async fn test_unbalanced_braces_rejected() {
        let compiler = PassthroughStyleCompiler::new();
        assert!(compiler.compile("#layer {", &binding()).await.is_err());
        assert!(compiler.compile("#layer }{", &binding()).await.is_err());
        assert!(compiler
            .compile("#layer { [zoom>3] { line-width: 2; } }", &binding())
            .await
            .is_ok());
    }
}
