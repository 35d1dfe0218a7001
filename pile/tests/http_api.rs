//! Integration tests for the HTTP API.
//!
//! Requests go through the full router of a running `PileApp` with mock
//! renderer and ingestion collaborators, so status codes, JSON error bodies
//! and tile headers are checked as a client sees them.
//!
//! Run with: `cargo test --test http_api`

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use pile::app::{AppConfig, Collaborators, PileApp};
use pile::cache::ServiceCacheConfig;
use pile::metadata::IngestionStatus;
use pile::render::PassthroughStyleCompiler;
use pile::server::TILE_OUTCOME_HEADER;

use common::{test_coordinator_config, CountingRenderer, MockIngestion};

// ============================================================================
// Helper Functions
// ============================================================================

struct TestApp {
    app: PileApp,
    router: Router,
    renderer: Arc<CountingRenderer>,
    ingestion: Arc<MockIngestion>,
}

async fn start_app() -> TestApp {
    let renderer = Arc::new(CountingRenderer::new());
    let ingestion = Arc::new(MockIngestion::new());
    let collaborators = Collaborators {
        compiler: Arc::new(PassthroughStyleCompiler::new()),
        renderer: renderer.clone(),
        ingestion: ingestion.clone(),
    };
    let config = AppConfig::new(ServiceCacheConfig::memory(16 * 1024 * 1024, None))
        .with_coordinator(test_coordinator_config());

    let app = PileApp::start_with(config, collaborators).await.unwrap();
    let router = app.router();
    TestApp {
        app,
        router,
        renderer,
        ingestion,
    }
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Bytes,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn header(&self, name: impl header::AsHeaderName) -> &str {
        self.headers.get(name).unwrap().to_str().unwrap()
    }
}

async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        body,
    }
}

async fn get(router: &Router, uri: &str) -> TestResponse {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn post(router: &Router, uri: &str, body: Body) -> TestResponse {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    send(router, request).await
}

async fn post_json(router: &Router, uri: &str, body: Value) -> TestResponse {
    post(router, uri, Body::from(body.to_string())).await
}

async fn create_layer(test: &TestApp, file_id: &str) -> Value {
    test.ingestion.add_ready(file_id, None);
    let response = post_json(
        &test.router,
        "/api/db/createLayer",
        json!({
            "file_id": file_id,
            "sql": "(SELECT * FROM table) as sub",
            "cartocss": "#layer { polygon-fill: #0a0; }"
        }),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    response.json()
}

fn assert_error(response: &TestResponse, status: StatusCode, code: u64) {
    assert_eq!(response.status, status);
    let body = response.json();
    assert_eq!(body["error_code"], json!(code));
    assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
}

// ============================================================================
// Health and Stats
// ============================================================================

#[tokio::test]
async fn test_health() {
    let test = start_app().await;

    let response = get(&test.router, "/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "ok");
    assert_eq!(response.json()["version"], pile::VERSION);

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_stats_count_tile_requests() {
    let test = start_app().await;
    let layer = create_layer(&test, "file_stats").await;
    let layer_id = layer["layer_id"].as_str().unwrap();

    get(&test.router, &format!("/tiles/{}/2/1/1.png", layer_id)).await;
    get(&test.router, &format!("/tiles/{}/2/1/1.png", layer_id)).await;

    let stats = get(&test.router, "/api/stats").await.json();
    assert_eq!(stats["telemetry"]["requests"], 2);
    assert_eq!(stats["telemetry"]["cache_hits"], 1);
    assert_eq!(stats["telemetry"]["renders_succeeded"], 1);
    assert_eq!(stats["coordinator"]["queued"], 0);

    test.app.shutdown().await;
}

// ============================================================================
// Layers
// ============================================================================

#[tokio::test]
async fn test_create_layer_without_body() {
    let test = start_app().await;

    let response = post(&test.router, "/api/db/createLayer", Body::empty()).await;
    assert_error(&response, StatusCode::BAD_REQUEST, 1);
    assert_eq!(response.json()["error"], "Please provide a request body");

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_create_layer_validation() {
    let test = start_app().await;

    let missing_file = post_json(
        &test.router,
        "/api/db/createLayer",
        json!({ "sql": "(SELECT * FROM table) as sub", "cartocss": "#layer {}" }),
    )
    .await;
    assert_error(&missing_file, StatusCode::BAD_REQUEST, 4);

    let malformed = post(&test.router, "/api/db/createLayer", Body::from("{not json")).await;
    assert_error(&malformed, StatusCode::BAD_REQUEST, 4);

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_create_layer_ingestion_states() {
    let test = start_app().await;
    let body = |file_id: &str| {
        json!({ "file_id": file_id, "sql": "(SELECT * FROM table) as sub", "cartocss": "#layer {}" })
    };

    let unknown = post_json(&test.router, "/api/db/createLayer", body("file_nope")).await;
    assert_error(&unknown, StatusCode::NOT_FOUND, 10);

    test.ingestion.insert(IngestionStatus {
        file_id: "file_busy".to_string(),
        upload_success: true,
        processing_success: false,
        ..Default::default()
    });
    let processing = post_json(&test.router, "/api/db/createLayer", body("file_busy")).await;
    assert_error(&processing, StatusCode::SERVICE_UNAVAILABLE, 20);

    test.ingestion.insert(IngestionStatus {
        file_id: "file_bad".to_string(),
        upload_success: true,
        error: Some(json!("invalid geometry")),
        ..Default::default()
    });
    let failed = post_json(&test.router, "/api/db/createLayer", body("file_bad")).await;
    assert_error(&failed, StatusCode::BAD_REQUEST, 4);
    assert_eq!(failed.json()["error"], "invalid geometry");

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_layer_lifecycle() {
    let test = start_app().await;
    let created = create_layer(&test, "file_lakes").await;
    let layer_id = created["layer_id"].as_str().unwrap();
    assert!(layer_id.starts_with("layer_id-"));
    assert_eq!(created["sql"], "(SELECT * FROM file_lakes) as sub");

    let fetched = get(&test.router, &format!("/api/db/getLayer?layer_id={}", layer_id)).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json(), created);

    let updated = post_json(
        &test.router,
        "/api/db/updateLayer",
        json!({ "layer_id": layer_id, "cartocss": "#layer { polygon-fill: #00f; }" }),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["cartocss"], "#layer { polygon-fill: #00f; }");
    assert_eq!(updated.json()["created_at"], created["created_at"]);

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_get_layer_errors() {
    let test = start_app().await;

    let missing_id = get(&test.router, "/api/db/getLayer").await;
    assert_error(&missing_id, StatusCode::BAD_REQUEST, 2);

    let unknown = get(&test.router, "/api/db/getLayer?layer_id=layer_id-nope").await;
    assert_error(&unknown, StatusCode::NOT_FOUND, 10);

    test.app.shutdown().await;
}

// ============================================================================
// Cubes
// ============================================================================

#[tokio::test]
async fn test_cube_lifecycle() {
    let test = start_app().await;

    let created = post(&test.router, "/api/cubes/create", Body::empty()).await;
    assert_eq!(created.status, StatusCode::OK);
    let cube = created.json();
    let cube_id = cube["cube_id"].as_str().unwrap();
    assert_eq!(cube["quality"], "png32");
    assert_eq!(cube["datasets"], json!([]));

    let added = post_json(
        &test.router,
        "/api/cubes/add",
        json!({
            "cube_id": cube_id,
            "datasets": [
                { "id": "file_a", "description": "first" },
                { "id": "file_b" }
            ]
        }),
    )
    .await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(
        added.json()["datasets"],
        json!([{ "id": "file_a", "description": "first" }, { "id": "file_b" }])
    );

    let removed = post_json(
        &test.router,
        "/api/cubes/remove",
        json!({ "cube_id": cube_id, "datasets": [{ "id": "file_a" }] }),
    )
    .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.json()["datasets"], json!([{ "id": "file_b" }]));

    let updated = post_json(
        &test.router,
        "/api/cubes/update",
        json!({ "cube_id": cube_id, "quality": "png8", "title": "Elevation" }),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);

    let fetched = get(&test.router, &format!("/api/cubes/get?cube_id={}", cube_id)).await;
    let fetched = fetched.json();
    assert_eq!(fetched["quality"], "png8");
    assert_eq!(fetched["title"], "Elevation");
    assert_eq!(fetched["datasets"], json!([{ "id": "file_b" }]));

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_cube_error_codes() {
    let test = start_app().await;
    let cube = post(&test.router, "/api/cubes/create", Body::empty()).await.json();
    let cube_id = cube["cube_id"].as_str().unwrap();

    let no_body = post(&test.router, "/api/cubes/add", Body::empty()).await;
    assert_error(&no_body, StatusCode::BAD_REQUEST, 1);

    let no_id = post_json(
        &test.router,
        "/api/cubes/add",
        json!({ "datasets": [{ "id": "file_a" }] }),
    )
    .await;
    assert_error(&no_id, StatusCode::BAD_REQUEST, 2);

    let no_datasets = post_json(&test.router, "/api/cubes/add", json!({ "cube_id": cube_id })).await;
    assert_error(&no_datasets, StatusCode::BAD_REQUEST, 3);

    let empty_remove = post_json(
        &test.router,
        "/api/cubes/remove",
        json!({ "cube_id": cube_id, "datasets": [] }),
    )
    .await;
    assert_error(&empty_remove, StatusCode::BAD_REQUEST, 3);

    let unknown = get(&test.router, "/api/cubes/get?cube_id=cube-nope").await;
    assert_error(&unknown, StatusCode::NOT_FOUND, 10);

    test.app.shutdown().await;
}

// ============================================================================
// Tiles
// ============================================================================

#[tokio::test]
async fn test_layer_tile_headers() {
    let test = start_app().await;
    let layer = create_layer(&test, "file_tiles").await;
    let uri = format!("/tiles/{}/10/511/340.png", layer["layer_id"].as_str().unwrap());

    let first = get(&test.router, &uri).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header(header::CONTENT_TYPE), "image/png");
    assert_eq!(first.header(header::CACHE_CONTROL), "public, max-age=3600");
    assert_eq!(first.header(TILE_OUTCOME_HEADER), "rendered");
    assert_eq!(first.body.as_ref(), b"#layer { polygon-fill: #0a0; }@10");

    let second = get(&test.router, &uri).await;
    assert_eq!(second.header(TILE_OUTCOME_HEADER), "cached");
    assert_eq!(second.body, first.body);
    assert_eq!(test.renderer.calls(), 1);

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_vector_tile_content_type() {
    let test = start_app().await;
    let layer = create_layer(&test, "file_vector").await;
    let uri = format!("/tiles/{}/3/2/1.pbf", layer["layer_id"].as_str().unwrap());

    let response = get(&test.router, &uri).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "application/x-protobuf");

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_failed_tile_is_placeholder() {
    let test = start_app().await;

    let response = get(&test.router, "/tiles/layer_id-nope/3/2/1.png").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "image/png");
    assert_eq!(response.header(header::CACHE_CONTROL), "no-store");
    assert_eq!(response.header(TILE_OUTCOME_HEADER), "error");
    assert!(response.body.starts_with(b"\x89PNG"));
    assert_eq!(test.renderer.calls(), 0);

    test.app.shutdown().await;
}

#[tokio::test]
async fn test_cube_tile_route() {
    let test = start_app().await;
    test.ingestion.add_ready("file_dem", None);
    let cube = post_json(
        &test.router,
        "/api/cubes/create",
        json!({ "datasets": [{ "id": "file_dem" }] }),
    )
    .await
    .json();

    let uri = format!(
        "/cubes/tile/{}/file_dem/4/3/2.png",
        cube["cube_id"].as_str().unwrap()
    );
    let response = get(&test.router, &uri).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(TILE_OUTCOME_HEADER), "rendered");

    test.app.shutdown().await;
}
