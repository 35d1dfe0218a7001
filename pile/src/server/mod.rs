//! HTTP API.
//!
//! | Route                                             | Handler                     |
//! |---------------------------------------------------|-----------------------------|
//! | `GET /tiles/{layer_id}/{z}/{x}/{file}`            | [`tiles::layer_tile`]       |
//! | `GET /cubes/tile/{cube}/{dataset}/{z}/{x}/{file}` | [`tiles::cube_tile`]        |
//! | `POST /api/db/createLayer`                        | [`metadata::create_layer`]  |
//! | `GET /api/db/getLayer`                            | [`metadata::get_layer`]     |
//! | `POST /api/db/updateLayer`                        | [`metadata::update_layer`]  |
//! | `POST /api/cubes/{create,add,remove,update}`      | [`metadata`]                |
//! | `GET /api/cubes/get`                              | [`metadata::get_cube`]      |
//! | `GET /health`, `GET /api/stats`                   | liveness and counters       |

mod error;
pub mod metadata;
pub mod tiles;

pub use error::{ApiError, ErrorBody};
pub use tiles::TILE_OUTCOME_HEADER;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::metadata::{CubeService, LayerService};
use crate::service::{ServiceStats, TileService};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub tiles: Arc<TileService>,
    pub layers: Arc<LayerService>,
    pub cubes: Arc<CubeService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tiles/:layer_id/:z/:x/:file", get(tiles::layer_tile))
        .route(
            "/cubes/tile/:cube_id/:dataset_id/:z/:x/:file",
            get(tiles::cube_tile),
        )
        .route("/api/db/createLayer", post(metadata::create_layer))
        .route("/api/db/getLayer", get(metadata::get_layer))
        .route("/api/db/updateLayer", post(metadata::update_layer))
        .route("/api/cubes/create", post(metadata::create_cube))
        .route("/api/cubes/get", get(metadata::get_cube))
        .route("/api/cubes/add", post(metadata::add_datasets))
        .route("/api/cubes/remove", post(metadata::remove_datasets))
        .route("/api/cubes/update", post(metadata::update_cube))
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

async fn stats(State(state): State<AppState>) -> Json<ServiceStats> {
    Json(state.tiles.stats())
}

/// Serves `router` on `listen` until `shutdown` resolves.
pub async fn serve<F>(router: Router, listen: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(listen).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
