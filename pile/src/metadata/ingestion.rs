//! Ingestion-status collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Dataset, IngestionError, DEFAULT_RASTER_COLUMN, DEFAULT_SRID};
use crate::cache::BoxFuture;
use crate::coord::geojson_extent;

/// Status document returned by the ingestion service for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionStatus {
    pub file_id: String,
    #[serde(default)]
    pub upload_success: bool,
    #[serde(default)]
    pub processing_success: bool,
    /// Free-form; usually a string, sometimes an object or `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Whether a file can be rendered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotUploaded,
    Failed(String),
    NotProcessed,
}

impl IngestionStatus {
    /// Reported error text, ignoring `null`, `false` and empty strings.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn readiness(&self) -> Readiness {
        if !self.upload_success {
            return Readiness::NotUploaded;
        }
        if let Some(message) = self.error_message() {
            return Readiness::Failed(message);
        }
        if !self.processing_success {
            return Readiness::NotProcessed;
        }
        Readiness::Ready
    }

    /// The dataset described by a ready status.
    ///
    /// `None` when the status lacks the table or database it lives in.
    pub fn dataset(&self) -> Option<Dataset> {
        let table_name = self.table_name.clone().filter(|t| !t.is_empty())?;
        let database_name = self.database_name.clone().filter(|d| !d.is_empty())?;

        let metadata = self.metadata.as_ref().and_then(|m| match m {
            Value::String(text) => serde_json::from_str::<Value>(text).ok(),
            other => Some(other.clone()),
        });
        let extent = metadata
            .as_ref()
            .and_then(|m| m.get("extent_geojson"))
            .and_then(geojson_extent);
        let srid = metadata
            .as_ref()
            .and_then(|m| m.get("srid"))
            .and_then(Value::as_u64)
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(DEFAULT_SRID);

        Some(Dataset {
            file_id: self.file_id.clone(),
            database_name,
            table_name,
            extent,
            geometry_column: DEFAULT_RASTER_COLUMN.to_string(),
            srid,
        })
    }
}

/// Looks up the ingestion status of a file.
pub trait IngestionStatusSource: Send + Sync {
    fn status<'a>(&'a self, file_id: &'a str)
        -> BoxFuture<'a, Result<IngestionStatus, IngestionError>>;
}
