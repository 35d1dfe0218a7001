//! Tile endpoints. They always answer `200` with an image; failures
//! degrade to placeholder tiles labelled by the `x-tile-outcome` header.

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};

use super::AppState;
use crate::service::{TileOutcome, TileResponse};
use crate::tile::OwnerKind;

pub const TILE_OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-tile-outcome");

/// `GET /tiles/{layer_id}/{z}/{x}/{y}.{png|pbf|grid}`
pub async fn layer_tile(
    State(state): State<AppState>,
    Path((layer_id, z, x, file)): Path<(String, String, String, String)>,
) -> Response {
    let response = state
        .tiles
        .serve(
            OwnerKind::Layer,
            &[layer_id.as_str(), z.as_str(), x.as_str(), file.as_str()],
        )
        .await;
    tile_response(response)
}

/// `GET /cubes/tile/{cube_id}/{dataset_id}/{z}/{x}/{y}.png`
pub async fn cube_tile(
    State(state): State<AppState>,
    Path((cube_id, dataset_id, z, x, file)): Path<(String, String, String, String, String)>,
) -> Response {
    let response = state
        .tiles
        .serve(
            OwnerKind::Cube,
            &[
                cube_id.as_str(),
                dataset_id.as_str(),
                z.as_str(),
                x.as_str(),
                file.as_str(),
            ],
        )
        .await;
    tile_response(response)
}

fn tile_response(response: TileResponse) -> Response {
    let cache_control = match response.outcome {
        TileOutcome::Error => "no-store",
        _ => "public, max-age=3600",
    };
    (
        [
            (
                CONTENT_TYPE,
                HeaderValue::from_static(response.blob.content_type()),
            ),
            (CACHE_CONTROL, HeaderValue::from_static(cache_control)),
            (
                TILE_OUTCOME_HEADER,
                HeaderValue::from_static(response.outcome.as_str()),
            ),
        ],
        response.blob.bytes,
    )
        .into_response()
}
