//! Upload pipeline orchestration.
//!
//! Stages, in order:
//! 1. sanitize the user id
//! 2. spool and decode the workbook on a blocking thread
//! 3. assemble rows, apply the validity gate and the in-upload dedup
//! 4. take the user's upload lock
//! 5. probe the store for persisted duplicates
//! 6. commit the admitted entries in one batch
//!
//! Nothing touches the store before stage 5; an input fault in stages 1-3
//! aborts the upload with no store contact at all.

use log::{debug, info, warn};
use std::io::Read;
use std::sync::Arc;

use super::commit::commit;
use super::dedup::{filter_persisted, BatchDeduplicator};
use super::upload_lock::UploadLocks;
use crate::config::PipelineSettings;
use crate::db::repository::TimetableRepository;
use crate::db::services::sanitize_user_id;
use crate::error::{IngestError, IngestResult};
use crate::models::{ScheduleEntry, UploadSummary, UserId};
use crate::parsing::{evaluate_row, missing_fields, read_first_sheet, RawCell, RowOutcome, UploadBuffer};

/// Entries that survived parsing and the in-upload filters.
#[derive(Debug, Default)]
struct ScreenedBatch {
    entries: Vec<ScheduleEntry>,
    summary: UploadSummary,
}

/// Shared ingestion entry point.
///
/// Cheap to clone; clones share the store handle and the lock registry.
#[derive(Clone)]
pub struct IngestPipeline {
    repository: Arc<dyn TimetableRepository>,
    settings: PipelineSettings,
    locks: UploadLocks,
}

impl IngestPipeline {
    pub fn new(repository: Arc<dyn TimetableRepository>, settings: PipelineSettings) -> Self {
        Self {
            repository,
            settings,
            locks: UploadLocks::new(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn TimetableRepository> {
        &self.repository
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Ingest one uploaded workbook for `raw_user_id`.
    pub async fn ingest_upload<R>(&self, reader: R, raw_user_id: &str) -> IngestResult<UploadSummary>
    where
        R: Read + Send + 'static,
    {
        let user = sanitize_user_id(raw_user_id)?;
        self.ingest_upload_for(&user, reader).await
    }

    /// Ingest one uploaded workbook for an already sanitized user id.
    pub async fn ingest_upload_for<R>(&self, user: &UserId, reader: R) -> IngestResult<UploadSummary>
    where
        R: Read + Send + 'static,
    {
        let header_rows = self.settings.header_rows;

        let rows = tokio::task::spawn_blocking(move || -> IngestResult<Vec<Vec<RawCell>>> {
            // The buffer is dropped (and its file removed) when this closure ends.
            let buffer = UploadBuffer::spool(reader)?;
            let sheet = read_first_sheet(&buffer)?;
            Ok(sheet.data_rows(header_rows).collect())
        })
        .await
        .map_err(|e| IngestError::internal(format!("Workbook parser task failed: {}", e)))??;

        debug!("Parsed {} data rows for user {}", rows.len(), user);
        self.ingest_rows(user, rows).await
    }

    /// Run the pipeline over already decoded data rows.
    pub async fn ingest_rows(
        &self,
        user: &UserId,
        rows: Vec<Vec<RawCell>>,
    ) -> IngestResult<UploadSummary> {
        let ScreenedBatch {
            entries,
            mut summary,
        } = screen_rows(rows);

        let _guard = self.locks.acquire(user).await;

        let probed = filter_persisted(
            self.repository.as_ref(),
            user,
            entries,
            self.settings.probe_concurrency,
            self.settings.probe_timeout(),
        )
        .await?;
        summary.persisted_duplicates = probed.persisted_duplicates;

        let receipt = commit(
            self.repository.as_ref(),
            user,
            &probed.admitted,
            self.settings.commit_timeout(),
        )
        .await?;
        summary.saved_count = receipt.saved_count();
        summary.saved_ids = receipt.saved_ids;

        info!(
            "Upload for user {}: {} rows, {} valid, {} invalid, {} already stored, {} repeated, {} saved",
            user,
            summary.rows_seen,
            summary.valid_records,
            summary.invalid_records,
            summary.persisted_duplicates,
            summary.batch_duplicates,
            summary.saved_count
        );
        Ok(summary)
    }
}

/// Assemble, gate and dedup rows without touching the store.
fn screen_rows(rows: Vec<Vec<RawCell>>) -> ScreenedBatch {
    let mut batch = ScreenedBatch::default();
    let mut dedup = BatchDeduplicator::new();

    for (position, row) in rows.iter().enumerate() {
        match evaluate_row(row) {
            RowOutcome::Skipped => {
                debug!("Data row {} has no group; skipped", position + 1);
            }
            RowOutcome::Rejected(entry) => {
                batch.summary.rows_seen += 1;
                batch.summary.invalid_records += 1;
                warn!(
                    "Data row {} rejected, missing: {}",
                    position + 1,
                    missing_fields(&entry).join(", ")
                );
            }
            RowOutcome::Assembled(entry) => {
                batch.summary.rows_seen += 1;
                batch.summary.valid_records += 1;
                if dedup.admit(&entry) {
                    batch.entries.push(entry);
                } else {
                    batch.summary.batch_duplicates += 1;
                }
            }
        }
    }

    batch
}
