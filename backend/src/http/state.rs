//! Application state for the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::TimetableRepository;
use crate::services::IngestPipeline;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: IngestPipeline,
    /// Request body limit in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: IngestPipeline, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
        }
    }

    pub fn repository(&self) -> &Arc<dyn TimetableRepository> {
        self.pipeline.repository()
    }

    /// Deadline applied to read and purge routes.
    pub fn store_timeout(&self) -> Duration {
        self.pipeline.settings().probe_timeout()
    }
}
