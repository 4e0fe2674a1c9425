//! Repository trait for abstracting the per-user timetable store.
//!
//! Every operation is scoped to one user partition. Implementations must be
//! `Send + Sync` so a single `Arc<dyn TimetableRepository>` can be shared by
//! the pipeline, the read services and the HTTP handlers.

pub mod error;

use async_trait::async_trait;

use crate::models::{MatchFields, ScheduleEntry, StoredEntry, UserId};

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

/// Document store holding timetable entries per user.
///
/// Entries are immutable once written: the store only creates them in
/// batches and deletes them in bulk.
#[async_trait]
pub trait TimetableRepository: Send + Sync {
    /// Check if the store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if healthy
    /// - `Ok(false)` if unhealthy but no error occurred
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Look up at most one stored entry whose discriminant fields all equal
    /// `fields`.
    async fn find_existing(
        &self,
        user: &UserId,
        fields: &MatchFields,
    ) -> RepositoryResult<Option<StoredEntry>>;

    /// Persist all `entries` in one atomic write.
    ///
    /// Returns the assigned identifiers in input order. On error nothing has
    /// been written.
    async fn batch_write(
        &self,
        user: &UserId,
        entries: &[ScheduleEntry],
    ) -> RepositoryResult<Vec<String>>;

    /// All entries of a user, in insertion order.
    async fn list_all(&self, user: &UserId) -> RepositoryResult<Vec<StoredEntry>>;

    async fn find_by_group(&self, user: &UserId, group: &str)
        -> RepositoryResult<Vec<StoredEntry>>;

    /// Fetch one entry by its identifier.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` if the entry doesn't exist
    async fn get_entry(&self, user: &UserId, id: &str) -> RepositoryResult<StoredEntry>;

    /// Remove every entry of a user and return how many were deleted.
    async fn delete_all(&self, user: &UserId) -> RepositoryResult<usize>;
}
