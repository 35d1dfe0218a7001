use std::time::Duration;

use reqwest::StatusCode;
use tracing::trace;

use super::RemoteError;
use crate::cache::BoxFuture;
use crate::metadata::{IngestionError, IngestionStatus, IngestionStatusSource};

/// Reads ingestion status with `GET {endpoint}?file_id=...`.
pub struct HttpIngestionStatus {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    access_token: Option<String>,
}

impl HttpIngestionStatus {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: super::client(timeout)?,
            endpoint: super::endpoint(endpoint)?,
            access_token: None,
        })
    }

    /// Sends `access_token` with every status request.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    async fn fetch(&self, file_id: &str) -> Result<IngestionStatus, IngestionError> {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("file_id", file_id);
            if let Some(token) = &self.access_token {
                query.append_pair("access_token", token);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestionError::Unavailable(format!("Status request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(IngestionError::UnknownFile(file_id.to_string())),
            status if !status.is_success() => {
                return Err(IngestionError::Unavailable(format!(
                    "HTTP {} from ingestion service",
                    status
                )))
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| IngestionError::Unavailable(format!("Failed to read status: {}", e)))?;
        let mut status: IngestionStatus = serde_json::from_slice(&body)
            .map_err(|e| IngestionError::Unavailable(format!("Undecodable status: {}", e)))?;
        if status.file_id.is_empty() {
            status.file_id = file_id.to_string();
        }

        trace!(file_id, ready = ?status.readiness(), "Ingestion status");
        Ok(status)
    }
}

impl IngestionStatusSource for HttpIngestionStatus {
    fn status<'a>(
        &'a self,
        file_id: &'a str,
    ) -> BoxFuture<'a, Result<IngestionStatus, IngestionError>> {
        Box::pin(self.fetch(file_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Readiness;
    use axum::extract::Query;
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn status_handler(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
        match params.get("file_id").map(String::as_str) {
            Some("file_ready") => Json(json!({
                "file_id": "file_ready",
                "upload_success": true,
                "processing_success": true,
                "table_name": "file_ready",
                "database_name": "vkt",
                "token_seen": params.contains_key("access_token"),
            }))
            .into_response(),
            Some("file_busy") => Json(json!({
                "file_id": "file_busy",
                "upload_success": true,
                "processing_success": false,
            }))
            .into_response(),
            Some("file_broken") => (AxumStatus::OK, "<html>").into_response(),
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn source() -> HttpIngestionStatus {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let router = Router::new().route("/api/import/status", get(status_handler));
            axum::serve(listener, router).await.unwrap();
        });
        HttpIngestionStatus::new(
            &format!("http://{}/api/import/status", addr),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_access_token("secret")
    }

    #[tokio::test]
    async fn test_ready_and_busy_files() {
        let source = source().await;

        let ready = source.status("file_ready").await.unwrap();
        assert_eq!(ready.readiness(), Readiness::Ready);
        assert_eq!(ready.dataset().unwrap().table_name, "file_ready");

        let busy = source.status("file_busy").await.unwrap();
        assert_eq!(busy.readiness(), Readiness::NotProcessed);
    }

    #[tokio::test]
    async fn test_unknown_and_undecodable() {
        let source = source().await;
        assert_eq!(
            source.status("file_missing").await.unwrap_err(),
            IngestionError::UnknownFile("file_missing".into())
        );
        assert!(matches!(
            source.status("file_broken").await.unwrap_err(),
            IngestionError::Unavailable(_)
        ));
    }
}
