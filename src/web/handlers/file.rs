//! File handlers: one per HTTP method on `/` and `/<name>`.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Uri},
    response::Response,
};
use std::sync::Arc;

use crate::file::Download;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Request `Content-Length`, if present and well formed.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// GET / and GET /:name - Stream the index document or a stored file.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Response<Body>, ApiError> {
    let Download {
        content_type,
        len,
        stream,
    } = state.store.get(uri.path()).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /:name - Store the request body as a new file.
pub async fn post_file(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<&'static str, ApiError> {
    state
        .store
        .put(
            uri.path(),
            declared_length(&headers),
            body.into_data_stream(),
        )
        .await?;

    Ok("OK")
}

/// DELETE /:name - Remove a stored file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<&'static str, ApiError> {
    state.store.delete(uri.path()).await?;

    Ok("OK")
}

/// Any other method.
pub async fn no_action() -> &'static str {
    "No action specified"
}
