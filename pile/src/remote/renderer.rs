use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::trace;

use super::RemoteError;
use crate::cache::BoxFuture;
use crate::render::{CompiledStyle, RenderError, RenderSpec, RenderedTile, Renderer};

#[derive(Serialize)]
struct RenderBody<'a> {
    spec: &'a RenderSpec,
    style: &'a str,
}

/// Posts `{spec, style}` to a rendering service and returns the encoded tile.
///
/// A 4xx reply means the service rejected the job and maps to
/// [`RenderError::Engine`]; connection failures and 5xx replies map to
/// [`RenderError::Datasource`].
pub struct HttpRenderer {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpRenderer {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: super::client(timeout)?,
            endpoint: super::endpoint(endpoint)?,
        })
    }

    async fn post(&self, spec: &RenderSpec, style: &CompiledStyle) -> Result<RenderedTile, RenderError> {
        let body = serde_json::to_vec(&RenderBody {
            spec,
            style: &style.document,
        })
        .map_err(|e| RenderError::Engine(format!("Failed to encode render job: {}", e)))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| RenderError::Datasource(format!("Render request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("HTTP {} from renderer: {}", status, detail.trim());
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                RenderError::Datasource(message)
            } else {
                RenderError::Engine(message)
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(spec.format.content_type())
            .to_string();
        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::Datasource(format!("Failed to read render response: {}", e)))?;

        trace!(bytes = bytes.len(), %content_type, "Renderer replied");
        Ok(RenderedTile {
            bytes,
            content_type,
        })
    }
}

impl Renderer for HttpRenderer {
    fn render<'a>(
        &'a self,
        spec: &'a RenderSpec,
        style: &'a CompiledStyle,
    ) -> BoxFuture<'a, Result<RenderedTile, RenderError>> {
        Box::pin(self.post(spec, style))
    }
}
