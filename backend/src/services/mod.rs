//! Ingestion services.
//!
//! The pipeline sequences parsing, the duplicate filters and the batched
//! commit. Each stage lives in its own module so it can be tested alone.

pub mod commit;
pub mod dedup;
pub mod ingest;
pub mod upload_lock;

pub use commit::{commit, CommitReceipt};
pub use dedup::{filter_persisted, BatchDeduplicator, ProbeOutcome};
pub use ingest::IngestPipeline;
pub use upload_lock::{UploadGuard, UploadLocks};
