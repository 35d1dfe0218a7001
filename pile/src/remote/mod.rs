//! HTTP adapters for the external renderer and ingestion service.

mod ingestion;
mod renderer;

pub use ingestion::HttpIngestionStatus;
pub use renderer::HttpRenderer;

use std::time::Duration;

use thiserror::Error;

/// Default request timeout of the ingestion-status client.
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

fn client(timeout: Duration) -> Result<reqwest::Client, RemoteError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RemoteError::ClientBuild(e.to_string()))
}

fn endpoint(url: &str) -> Result<reqwest::Url, RemoteError> {
    reqwest::Url::parse(url).map_err(|e| RemoteError::InvalidEndpoint {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
