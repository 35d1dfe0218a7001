//! Layer and cube management endpoints.
//!
//! Bodies are read as raw bytes so that a missing body is reported with its
//! own error code instead of axum's rejection.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::ApiError;
use super::AppState;
use crate::error::{codes, PileError};
use crate::metadata::{Cube, CubeDraft, CubePatch, DatasetRef, Layer, LayerDraft, LayerPatch};

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::missing_body());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError(PileError::validation(
            codes::INVALID_FIELD,
            format!("Invalid request body: {}", e),
        ))
    })
}

#[derive(Debug, Deserialize)]
pub struct LayerQuery {
    #[serde(default)]
    layer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CubeQuery {
    #[serde(default)]
    cube_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateLayerBody {
    #[serde(default)]
    layer_id: String,
    #[serde(flatten)]
    patch: LayerPatch,
}

#[derive(Debug, Deserialize)]
struct AddDatasetsBody {
    #[serde(default)]
    cube_id: String,
    #[serde(default)]
    datasets: Vec<DatasetRef>,
}

/// Datasets to remove, by id or as the objects returned from `add`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DatasetSelector {
    Id(String),
    Ref { id: String },
}

impl DatasetSelector {
    fn into_id(self) -> String {
        match self {
            DatasetSelector::Id(id) | DatasetSelector::Ref { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoveDatasetsBody {
    #[serde(default)]
    cube_id: String,
    #[serde(default)]
    datasets: Vec<DatasetSelector>,
}

#[derive(Debug, Deserialize)]
struct UpdateCubeBody {
    #[serde(default)]
    cube_id: String,
    #[serde(flatten)]
    patch: CubePatch,
}

/// `POST /api/db/createLayer`
pub async fn create_layer(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Layer>, ApiError> {
    let draft: LayerDraft = parse_body(&body)?;
    Ok(Json(state.layers.create(draft).await?))
}

/// `GET /api/db/getLayer?layer_id=`
pub async fn get_layer(
    State(state): State<AppState>,
    Query(query): Query<LayerQuery>,
) -> Result<Json<Layer>, ApiError> {
    Ok(Json(state.layers.get(&query.layer_id).await?))
}

/// `POST /api/db/updateLayer`
pub async fn update_layer(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Layer>, ApiError> {
    let UpdateLayerBody { layer_id, patch } = parse_body(&body)?;
    Ok(Json(state.layers.update(&layer_id, patch).await?))
}

/// `POST /api/cubes/create`. An empty body creates a cube with defaults.
pub async fn create_cube(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Cube>, ApiError> {
    let draft: CubeDraft = if body.is_empty() {
        CubeDraft::default()
    } else {
        parse_body(&body)?
    };
    Ok(Json(state.cubes.create(draft).await?))
}

/// `GET /api/cubes/get?cube_id=`
pub async fn get_cube(
    State(state): State<AppState>,
    Query(query): Query<CubeQuery>,
) -> Result<Json<Cube>, ApiError> {
    Ok(Json(state.cubes.get(&query.cube_id).await?))
}

/// `POST /api/cubes/add`
pub async fn add_datasets(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Cube>, ApiError> {
    let AddDatasetsBody { cube_id, datasets } = parse_body(&body)?;
    Ok(Json(state.cubes.add(&cube_id, datasets).await?))
}

/// `POST /api/cubes/remove`
pub async fn remove_datasets(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Cube>, ApiError> {
    let RemoveDatasetsBody { cube_id, datasets } = parse_body(&body)?;
    let ids = datasets.into_iter().map(DatasetSelector::into_id).collect();
    Ok(Json(state.cubes.remove(&cube_id, ids).await?))
}

/// `POST /api/cubes/update`
pub async fn update_cube(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Cube>, ApiError> {
    let UpdateCubeBody { cube_id, patch } = parse_body(&body)?;
    Ok(Json(state.cubes.update(&cube_id, patch).await?))
}
