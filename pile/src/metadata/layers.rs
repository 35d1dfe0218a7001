//! Layer management.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    next_timestamp, now_ms, IngestionError, IngestionStatusSource, Layer, MetadataStore,
    Readiness, DEFAULT_CARTOCSS_VERSION, DEFAULT_GEOM_COLUMN, DEFAULT_GEOM_TYPE, DEFAULT_SRID,
    LAYER_ID_PREFIX,
};
use crate::error::{codes, PileError};

/// Placeholder in layer SQL that is replaced with the ingested table name.
pub const TABLE_PLACEHOLDER: &str = "table";

pub const NOT_UPLOADED_MESSAGE: &str =
    "The data was not uploaded correctly. Please check your data and error messages, and try again.";
pub const NOT_PROCESSED_MESSAGE: &str =
    "The data is not done processing yet. Please try again in a little while.";

/// Body of a layer creation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerDraft {
    pub file_id: Option<String>,
    pub sql: Option<String>,
    pub cartocss: Option<String>,
    pub cartocss_version: Option<String>,
    pub geom_column: Option<String>,
    pub geom_type: Option<String>,
    pub raster_band: Option<u32>,
    pub srid: Option<u32>,
}

/// Fields of a layer that may change after creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerPatch {
    pub sql: Option<String>,
    pub cartocss: Option<String>,
    pub cartocss_version: Option<String>,
}

fn required(value: Option<String>, message: &str) -> Result<String, PileError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PileError::validation(codes::INVALID_FIELD, message))
}

pub(crate) fn ingestion_error(file_id: &str, err: IngestionError) -> PileError {
    match err {
        IngestionError::UnknownFile(_) => PileError::not_found(format!("No such file: {}", file_id)),
        IngestionError::Unavailable(reason) => PileError::upstream(reason),
    }
}

pub struct LayerService {
    store: Arc<dyn MetadataStore>,
    ingestion: Arc<dyn IngestionStatusSource>,
}

impl LayerService {
    pub fn new(store: Arc<dyn MetadataStore>, ingestion: Arc<dyn IngestionStatusSource>) -> Self {
        Self { store, ingestion }
    }

    /// Binds a style to an ingested file and persists the layer.
    #[instrument(skip(self, draft), fields(file_id = ?draft.file_id))]
    pub async fn create(&self, draft: LayerDraft) -> Result<Layer, PileError> {
        let file_id = required(draft.file_id, "Please provide a file_id.")?;
        let sql = required(draft.sql, "Please provide a SQL statement.")?;
        let cartocss = required(draft.cartocss, "Please provide CartoCSS.")?;

        let status = self
            .ingestion
            .status(&file_id)
            .await
            .map_err(|e| ingestion_error(&file_id, e))?;

        match status.readiness() {
            Readiness::Ready => {}
            Readiness::NotUploaded => {
                return Err(PileError::validation(codes::INVALID_FIELD, NOT_UPLOADED_MESSAGE))
            }
            Readiness::Failed(message) => {
                return Err(PileError::validation(codes::INVALID_FIELD, message))
            }
            Readiness::NotProcessed => return Err(PileError::upstream(NOT_PROCESSED_MESSAGE)),
        }

        let dataset = status.dataset().ok_or_else(|| {
            PileError::upstream(format!("Ingestion status of {} names no table", file_id))
        })?;

        let now = now_ms();
        let layer = Layer {
            layer_id: format!("{}{}", LAYER_ID_PREFIX, Uuid::new_v4()),
            file_id,
            sql: sql.replacen(TABLE_PLACEHOLDER, &dataset.table_name, 1),
            cartocss,
            database_name: dataset.database_name,
            table_name: dataset.table_name,
            cartocss_version: draft
                .cartocss_version
                .unwrap_or_else(|| DEFAULT_CARTOCSS_VERSION.to_string()),
            geom_column: draft
                .geom_column
                .unwrap_or_else(|| DEFAULT_GEOM_COLUMN.to_string()),
            geom_type: draft.geom_type.unwrap_or_else(|| DEFAULT_GEOM_TYPE.to_string()),
            raster_band: draft.raster_band.unwrap_or(0),
            srid: draft.srid.unwrap_or(DEFAULT_SRID),
            extent: dataset.extent.map(|bounds| bounds.to_envelope()),
            created_at: now,
            timestamp: now,
        };

        self.store.put_layer(&layer).await?;
        info!(layer_id = %layer.layer_id, table = %layer.table_name, "Layer created");
        Ok(layer)
    }

    pub async fn get(&self, layer_id: &str) -> Result<Layer, PileError> {
        if layer_id.is_empty() {
            return Err(PileError::validation(
                codes::MISSING_ID,
                "Please provide a layer_id.",
            ));
        }
        self.store
            .layer(layer_id)
            .await?
            .ok_or_else(|| PileError::not_found(format!("No such layer: {}", layer_id)))
    }

    /// Changes the query or style. A new style text hashes to new cache keys,
    /// so tiles of the previous style are never served again.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, layer_id: &str, patch: LayerPatch) -> Result<Layer, PileError> {
        let mut layer = self.get(layer_id).await?;

        if let Some(sql) = patch.sql.filter(|s| !s.trim().is_empty()) {
            layer.sql = sql.replacen(TABLE_PLACEHOLDER, &layer.table_name, 1);
        }
        if let Some(cartocss) = patch.cartocss {
            layer.cartocss = cartocss;
        }
        if let Some(version) = patch.cartocss_version {
            layer.cartocss_version = version;
        }
        layer.timestamp = next_timestamp(layer.timestamp);

        self.store.put_layer(&layer).await?;
        info!(layer_id = %layer.layer_id, "Layer updated");
        Ok(layer)
    }
}
