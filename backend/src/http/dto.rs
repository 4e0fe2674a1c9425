//! Data Transfer Objects for the HTTP API.

use serde::{Deserialize, Serialize};

pub use crate::models::{StoredEntry, UploadResponse};

/// Multipart form field carrying the user id.
pub const USER_ID_FIELD: &str = "userId";

/// Response of `DELETE /api/timetable/{userId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub message: String,
    pub count: usize,
}

/// Collected parts of an upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub user_id: Option<String>,
    pub file: Option<axum::body::Bytes>,
}
