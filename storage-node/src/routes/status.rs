//! Storage status page, as HTML or JSON.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use storage_status::status::{self, StatusFormat};

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    t: Option<String>,
}

/// GET /storage[?t=json]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Response, AppError> {
    let format = StatusFormat::from_query(query.t.as_deref());
    let engine = state.engine.clone();

    let body = tokio::task::spawn_blocking(move || status::render(engine.as_ref(), format))
        .await
        .map_err(|e| anyhow::anyhow!(e))??;

    let content_type = match format {
        StatusFormat::Html => "text/html; charset=utf-8",
        StatusFormat::Json => "application/json",
    };

    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, get, send};
    use axum::http::{header, StatusCode};
    use serde_json::json;
    use storage_status::crawler::CrawlerProgressState;
    use storage_status::engine::MemoryEngine;

    fn engine() -> MemoryEngine {
        let progress: CrawlerProgressState = serde_json::from_value(json!({
            "cycle-in-progress": true,
            "cycle-complete-percentage": 50.0,
            "remaining-sleep-time": 10.0,
            "estimated-cycle-complete-time-left": 120.0,
        }))
        .unwrap();

        MemoryEngine::new()
            .with_stat("storage_server.disk_avail", 4096)
            .with_progress(progress)
    }

    #[tokio::test]
    async fn test_html_status() {
        let (response, body) = send(app(engine()), get("/storage")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );

        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("Current crawl 50.0% complete (ETA 120s) (next work in 10 seconds)"));
        assert!(body.contains("Total buckets: Not computed yet"));
    }

    #[tokio::test]
    async fn test_json_status() {
        let (response, body) = send(app(engine()), get("/storage?t=json")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["stats"]["storage_server.disk_avail"], json!(4096));
        assert_eq!(value["bucket-counter"], json!({}));
    }

    #[tokio::test]
    async fn test_engine_failure_is_server_error() {
        let (response, body) = send(app(MemoryEngine::new().failing()), get("/storage?t=json")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Internal server error");
    }
}
