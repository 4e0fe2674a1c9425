//! HTTP handlers for the REST API.
//!
//! Handlers only translate between HTTP and the pipeline / service layer.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::io::Cursor;

use super::dto::{PurgeResponse, StoredEntry, UploadForm, UploadResponse, USER_ID_FIELD};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Liveness
// =============================================================================

/// GET /health and GET /_ah/warmup
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /
pub async fn landing() -> &'static str {
    "Timetable ingest service"
}

// =============================================================================
// Upload
// =============================================================================

/// POST /api/upload
///
/// Multipart form with a `userId` text field and one file field.
pub async fn upload_timetable(
    State(state): State<AppState>,
    multipart: Multipart,
) -> HandlerResult<UploadResponse> {
    let form = read_upload_form(multipart).await?;

    let Some(file) = form.file else {
        return Err(AppError::BadRequest("No file uploaded".to_string()));
    };
    let raw_user_id = form.user_id.unwrap_or_default();
    log::info!("Received upload of {} bytes", file.len());

    let user = db_services::sanitize_user_id(&raw_user_id)?;
    let summary = state
        .pipeline
        .ingest_upload_for(&user, Cursor::new(file))
        .await?;

    Ok(Json(UploadResponse::from_summary(&user, summary)))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some(USER_ID_FIELD) {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid userId field: {}", e)))?;
            form.user_id = Some(value);
        } else if field.file_name().is_some() && form.file.is_none() {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read uploaded file: {}", e)))?;
            form.file = Some(data);
        }
    }
    Ok(form)
}

// =============================================================================
// Reads
// =============================================================================

/// GET /api/timetable/{userId}
pub async fn list_timetables(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> HandlerResult<Vec<StoredEntry>> {
    let user = db_services::sanitize_user_id(&user_id)?;
    let entries =
        db_services::list_timetables(state.repository().as_ref(), &user, state.store_timeout())
            .await?;
    Ok(Json(entries))
}

/// GET /api/group/{userId}/{group}
pub async fn timetables_by_group(
    State(state): State<AppState>,
    Path((user_id, group)): Path<(String, String)>,
) -> HandlerResult<Vec<StoredEntry>> {
    let user = db_services::sanitize_user_id(&user_id)?;
    let group = group.trim();
    if group.is_empty() {
        return Err(AppError::BadRequest("Group parameter is missing".to_string()));
    }
    let entries = db_services::timetables_by_group(
        state.repository().as_ref(),
        &user,
        group,
        state.store_timeout(),
    )
    .await?;
    Ok(Json(entries))
}

/// GET /api/{userId}/{id}
pub async fn get_timetable(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, String)>,
) -> HandlerResult<StoredEntry> {
    let user = db_services::sanitize_user_id(&user_id)?;
    match db_services::get_timetable(state.repository().as_ref(), &user, &id, state.store_timeout())
        .await
    {
        Ok(entry) => Ok(Json(entry)),
        Err(e) if e.is_not_found() => Err(AppError::NotFound("Time Table not found".to_string())),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Purge
// =============================================================================

/// DELETE /api/timetable/{userId}
pub async fn purge_timetables(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> HandlerResult<PurgeResponse> {
    let user = db_services::sanitize_user_id(&user_id)?;
    let count =
        db_services::purge_timetables(state.repository().as_ref(), &user, state.store_timeout())
            .await?;
    Ok(Json(PurgeResponse {
        message: format!("All timetables deleted successfully {}", user),
        count,
    }))
}
