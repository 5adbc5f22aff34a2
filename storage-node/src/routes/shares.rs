//! Byte-range reads of immutable shares.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use storage_status::share::ShareReader;

/// Share numbers are plain decimal: no sign, no whitespace
fn parse_share_number(text: &str) -> Result<u32, AppError> {
    let invalid = || AppError::BadRequest(format!("Invalid share number: {text:?}"));
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    text.parse().map_err(|_| invalid())
}

/// GET /storage/imm/SI/{storage_index}/share/{share_number}
///
/// Requires `Range: bytes=<first>-<last>` and answers with exactly that span.
pub async fn get_share(
    State(state): State<Arc<AppState>>,
    Path((storage_index, share_number)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let share_number = parse_share_number(&share_number)?;

    let range = headers
        .get(header::RANGE)
        .map(|v| v.to_str().map(str::to_string))
        .transpose()
        .map_err(|_| AppError::BadRequest("Range header is not valid ASCII".into()))?;

    let engine = state.engine.clone();
    let si = storage_index.clone();
    let slice = tokio::task::spawn_blocking(move || {
        ShareReader::new(engine.as_ref()).fetch(&si, share_number, range.as_deref())
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    tracing::debug!(
        storage_index = %storage_index,
        share_number,
        range = %slice.range,
        "Serving share range"
    );

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_RANGE, format!("{}/*", slice.range)),
        ],
        slice.data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::parse_share_number;
    use crate::routes::test_support::{app, get, send};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use storage_status::engine::MemoryEngine;
    use storage_status::StorageIndex;

    fn si() -> StorageIndex {
        StorageIndex::from_bytes([9u8; 16])
    }

    fn engine() -> MemoryEngine {
        MemoryEngine::new().with_share(si(), 4, (0u8..100).collect::<Vec<u8>>())
    }

    fn ranged(uri: &str, range: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::RANGE, range)
            .body(Body::empty())
            .unwrap()
    }

    fn share_uri(shnum: &str) -> String {
        format!("/storage/imm/SI/{}/share/{shnum}", si())
    }

    #[tokio::test]
    async fn test_range_read() {
        let (response, body) = send(app(engine()), ranged(&share_uri("4"), "bytes=10-19")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 10-19/*");
        assert_eq!(body, (10u8..20).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn test_missing_range_is_bad_request() {
        let (response, _) = send(app(engine()), get(&share_uri("4"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_open_range_is_bad_request() {
        let (response, _) = send(app(engine()), ranged(&share_uri("4"), "bytes=10-")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_storage_index_is_bad_request() {
        let request = ranged("/storage/imm/SI/NOTBASE32/share/4", "bytes=0-1");
        let (response, body) = send(app(engine()), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].as_str().unwrap().starts_with("Invalid storage index"));
    }

    #[tokio::test]
    async fn test_bad_share_number_is_bad_request() {
        let (response, _) = send(app(engine()), ranged(&share_uri("-1"), "bytes=0-1")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signed_share_number_is_bad_request() {
        let (response, _) = send(app(engine()), ranged(&share_uri("+4"), "bytes=0-1")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_share_number() {
        assert_eq!(parse_share_number("4").unwrap(), 4);
        assert_eq!(parse_share_number("007").unwrap(), 7);
        for text in ["", "+4", "-4", " 4", "4 ", "٤", "4294967296"] {
            assert!(parse_share_number(text).is_err(), "{text:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_unknown_share_is_not_found() {
        let (response, _) = send(app(engine()), ranged(&share_uri("5"), "bytes=0-1")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_range_past_end_is_not_found() {
        let (response, body) = send(app(engine()), ranged(&share_uri("4"), "bytes=95-104")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!body.is_empty());
        assert!(serde_json::from_slice::<serde_json::Value>(&body).is_ok());
    }

    #[tokio::test]
    async fn test_engine_failure_is_server_error() {
        let failing = MemoryEngine::new().failing();
        let (response, _) = send(app(failing), ranged(&share_uri("4"), "bytes=0-1")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
