//! API error handling for the HTTP surface.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::file::StoreError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Not found (404).
    NotFound,
    /// Conflict (409).
    Conflict,
    /// Payload too large (413).
    PayloadTooLarge,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    close_connection: bool,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            close_connection: false,
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Create a payload too large error.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadTooLarge, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Ask the server to drop the connection after this response, so a
    /// client still pushing a request body cannot keep going.
    pub fn closing(mut self) -> Self {
        self.close_connection = true;
        self
    }

    /// Error code of this error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if self.close_connection {
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPath(path) => {
                tracing::debug!(path = %path, "Rejected invalid filename");
                ApiError::bad_request("Invalid filename")
            }
            StoreError::NotFound(name) => ApiError::not_found(format!("File not found: {name}")),
            StoreError::AlreadyExists(name) => {
                ApiError::conflict(format!("File already exists: {name}"))
            }
            StoreError::TooLarge { limit } => {
                ApiError::payload_too_large(format!("File too large (max {limit} bytes)")).closing()
            }
            // Nobody is left to read this response.
            StoreError::ClientClosed => ApiError::bad_request("Upload incomplete").closing(),
            StoreError::Io(e) => {
                tracing::error!("Internal error: {}", e);
                ApiError::internal("Internal error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_mapping() {
        let cases = [
            (StoreError::InvalidPath("../x".into()), ErrorCode::BadRequest),
            (StoreError::NotFound("a".into()), ErrorCode::NotFound),
            (StoreError::AlreadyExists("a".into()), ErrorCode::Conflict),
            (StoreError::TooLarge { limit: 1 }, ErrorCode::PayloadTooLarge),
            (StoreError::ClientClosed, ErrorCode::BadRequest),
            (
                StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
                ErrorCode::InternalError,
            ),
        ];

        for (store_err, code) in cases {
            assert_eq!(ApiError::from(store_err).code(), code);
        }
    }

    #[test]
    fn test_too_large_closes_connection() {
        let response = ApiError::from(StoreError::TooLarge { limit: 10 }).into_response();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers().get(header::CONNECTION).unwrap(), "close");
    }

    #[test]
    fn test_not_found_keeps_connection() {
        let response = ApiError::from(StoreError::NotFound("a".into())).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONNECTION).is_none());
    }

    #[test]
    fn test_display() {
        let err = ApiError::conflict("dup");
        assert_eq!(err.to_string(), "Conflict: dup");
    }
}
