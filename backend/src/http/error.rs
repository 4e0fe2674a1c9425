//! HTTP error handling.
//!
//! Every error body has the upload response shape with `message = "Error"`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};

use crate::db::repository::RepositoryError;
use crate::error::IngestError;
use crate::models::UploadResponse;

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Pipeline error; input faults map to 400, everything else to 500
    Ingest(IngestError),
    /// Store error; `NotFound` maps to 404
    Repository(RepositoryError),
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Ingest(e) if e.is_input_fault() => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Ingest(IngestError::Store(e)) => AppError::Repository(e).status_and_message(),
            AppError::Ingest(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Repository(e) if e.is_not_found() => (StatusCode::NOT_FOUND, e.to_string()),
            AppError::Repository(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, message);
        } else {
            warn!("Request rejected ({}): {}", status, message);
        }
        (status, Json(UploadResponse::error(message))).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Ingest(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Ingest(IngestError::input("No sheet")), StatusCode::BAD_REQUEST),
            (
                AppError::Ingest(RepositoryError::timeout("probe").into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Repository(RepositoryError::not_found("gone")),
                StatusCode::NOT_FOUND,
            ),
            (AppError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
