//! Error taxonomy shared by the tile path and the management endpoints.
//!
//! | Variant               | Tile endpoints       | Metadata endpoints |
//! |-----------------------|----------------------|--------------------|
//! | `Validation`          | error tile           | 400                |
//! | `NotFound`            | error tile           | 404                |
//! | `UpstreamUnavailable` | error tile           | 503                |
//! | `Render`              | error tile           | 502                |
//! | `Storage`             | error tile           | 500                |

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::render::RenderError;

/// Numeric codes carried in JSON error bodies.
pub mod codes {
    /// Request had no body.
    pub const MISSING_BODY: u32 = 1;
    /// Request did not name the resource it operates on.
    pub const MISSING_ID: u32 = 2;
    /// Request had no datasets to add or remove.
    pub const MISSING_DATASETS: u32 = 3;
    /// A required field is missing or malformed.
    pub const INVALID_FIELD: u32 = 4;
    /// Tile path segments are malformed or out of range.
    pub const INVALID_TILE: u32 = 5;
    pub const NOT_FOUND: u32 = 10;
    pub const UPSTREAM_UNAVAILABLE: u32 = 20;
    pub const RENDER_FAILED: u32 = 30;
    pub const STORAGE: u32 = 40;
}

#[derive(Debug, Error)]
pub enum PileError {
    /// Malformed coordinates, identifiers or request bodies.
    #[error("{message}")]
    Validation { code: u32, message: String },

    /// Unknown layer, cube or dataset.
    #[error("{0}")]
    NotFound(String),

    /// The dataset is not ingested yet, or the ingestion service is down.
    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] MetadataError),
}

impl PileError {
    pub fn validation(code: u32, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    pub fn error_code(&self) -> u32 {
        match self {
            PileError::Validation { code, .. } => *code,
            PileError::NotFound(_) => codes::NOT_FOUND,
            PileError::UpstreamUnavailable(_) => codes::UPSTREAM_UNAVAILABLE,
            PileError::Render(_) => codes::RENDER_FAILED,
            PileError::Storage(_) => codes::STORAGE,
        }
    }
}
