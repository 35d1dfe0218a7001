//! Cube management.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    next_timestamp, now_ms, Cube, DatasetRef, MetadataStore, CUBE_ID_PREFIX, DEFAULT_CUBE_QUALITY,
    DEFAULT_CUBE_STYLE,
};
use crate::error::{codes, PileError};

/// Fields a patch may not overwrite.
const RESERVED_FIELDS: &[&str] = &[
    "cube_id",
    "datasets",
    "created_at",
    "timestamp",
    "created_by",
    "access_token",
];

/// Body of a cube creation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CubeDraft {
    pub style: Option<String>,
    pub quality: Option<String>,
    pub datasets: Option<Vec<DatasetRef>>,
    pub created_by: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Changes applied by `CubeService::update`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CubePatch {
    pub style: Option<String>,
    pub quality: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

fn missing_cube_id() -> PileError {
    PileError::validation(codes::MISSING_ID, "Please provide a cube id")
}

fn missing_datasets() -> PileError {
    PileError::validation(codes::MISSING_DATASETS, "Please provide datasets")
}

fn strip_reserved(options: &mut Map<String, Value>) {
    for field in RESERVED_FIELDS {
        options.remove(*field);
    }
}

pub struct CubeService {
    store: Arc<dyn MetadataStore>,
    // read-modify-write of one record must not interleave
    edit: Mutex<()>,
}

impl CubeService {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            edit: Mutex::new(()),
        }
    }

    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: CubeDraft) -> Result<Cube, PileError> {
        let mut options = draft.options;
        strip_reserved(&mut options);
        let now = now_ms();

        let cube = Cube {
            cube_id: format!("{}{}", CUBE_ID_PREFIX, Uuid::new_v4()),
            style: draft
                .style
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CUBE_STYLE.to_string()),
            quality: draft
                .quality
                .filter(|q| !q.is_empty())
                .unwrap_or_else(|| DEFAULT_CUBE_QUALITY.to_string()),
            datasets: draft.datasets.unwrap_or_default(),
            created_at: now,
            timestamp: now,
            created_by: draft.created_by,
            options,
        };

        self.store.put_cube(&cube).await?;
        info!(cube_id = %cube.cube_id, datasets = cube.datasets.len(), "Cube created");
        Ok(cube)
    }

    pub async fn get(&self, cube_id: &str) -> Result<Cube, PileError> {
        if cube_id.is_empty() {
            return Err(missing_cube_id());
        }
        self.store
            .cube(cube_id)
            .await?
            .ok_or_else(|| PileError::not_found(format!("No such cube_id: {}", cube_id)))
    }

    /// Appends datasets in the given order.
    #[instrument(skip(self, datasets), fields(count = datasets.len()))]
    pub async fn add(&self, cube_id: &str, datasets: Vec<DatasetRef>) -> Result<Cube, PileError> {
        if cube_id.is_empty() {
            return Err(missing_cube_id());
        }
        if datasets.is_empty() {
            return Err(missing_datasets());
        }

        self.modify(cube_id, |cube| cube.datasets.extend(datasets))
            .await
    }

    /// Removes every member whose id is listed.
    #[instrument(skip(self, dataset_ids), fields(count = dataset_ids.len()))]
    pub async fn remove(&self, cube_id: &str, dataset_ids: Vec<String>) -> Result<Cube, PileError> {
        if cube_id.is_empty() {
            return Err(missing_cube_id());
        }
        if dataset_ids.is_empty() {
            return Err(missing_datasets());
        }

        self.modify(cube_id, |cube| {
            cube.datasets.retain(|d| !dataset_ids.contains(&d.id))
        })
        .await
    }

    /// Merges style, quality and free-form options into the cube.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, cube_id: &str, patch: CubePatch) -> Result<Cube, PileError> {
        if cube_id.is_empty() {
            return Err(missing_cube_id());
        }

        let mut options = patch.options;
        strip_reserved(&mut options);

        self.modify(cube_id, |cube| {
            if let Some(style) = patch.style {
                cube.style = style;
            }
            if let Some(quality) = patch.quality {
                cube.quality = quality;
            }
            cube.options.extend(options);
        })
        .await
    }

    async fn modify<F>(&self, cube_id: &str, change: F) -> Result<Cube, PileError>
    where
        F: FnOnce(&mut Cube),
    {
        let _guard = self.edit.lock().await;

        let mut cube = self.get(cube_id).await?;
        change(&mut cube);
        cube.timestamp = next_timestamp(cube.timestamp);

        self.store.put_cube(&cube).await?;
        info!(cube_id = %cube.cube_id, datasets = cube.datasets.len(), "Cube updated");
        Ok(cube)
    }
}
