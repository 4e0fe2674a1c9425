//! High-level timetable store service layer.
//!
//! Repository-agnostic operations used by the HTTP handlers and the ingestion
//! pipeline. Every store call made here is bounded by an explicit deadline;
//! running out of time yields a [`RepositoryError::TimeoutError`].
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use timetable_ingest::db::{services, repositories::LocalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let user = services::sanitize_user_id("userId=alice")?;
//!
//!     let entries = services::list_timetables(&repo, &user, Duration::from_secs(30)).await?;
//!     println!("{} has {} entries", user, entries.len());
//!     Ok(())
//! }
//! ```

use log::{info, warn};
use std::future::Future;
use std::time::Duration;

use super::repository::{ErrorContext, RepositoryError, RepositoryResult, TimetableRepository};
use crate::error::{IngestError, IngestResult};
use crate::models::{StoredEntry, UserId};

/// Literal prefix some clients send in front of the user id.
const USER_ID_PREFIX: &str = "userId=";

/// Turn a raw user id from a request into a partition key.
///
/// Strips an optional `userId=` prefix and surrounding whitespace.
pub fn sanitize_user_id(raw: &str) -> IngestResult<UserId> {
    let trimmed = raw.trim();
    let value = trimmed.strip_prefix(USER_ID_PREFIX).unwrap_or(trimmed).trim();
    if value.is_empty() {
        return Err(IngestError::input("User ID is missing"));
    }
    Ok(UserId::new(value))
}

/// Run a store operation under a deadline.
pub async fn bounded<T, F>(operation: &str, limit: Duration, future: F) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result.map_err(|e| {
            if e.context().operation.is_none() {
                e.with_operation(operation)
            } else {
                e
            }
        }),
        Err(_) => {
            warn!("Store operation '{}' exceeded {:?}", operation, limit);
            Err(RepositoryError::timeout_with_context(
                format!("{} did not complete within {}ms", operation, limit.as_millis()),
                ErrorContext::new(operation),
            ))
        }
    }
}

// ==================== Health & Connection ====================

/// Check if the store is reachable.
pub async fn health_check<R>(repo: &R, limit: Duration) -> RepositoryResult<bool>
where
    R: TimetableRepository + ?Sized,
{
    bounded("health_check", limit, repo.health_check()).await
}

// ==================== Timetable reads ====================

/// All entries of a user.
pub async fn list_timetables<R>(
    repo: &R,
    user: &UserId,
    limit: Duration,
) -> RepositoryResult<Vec<StoredEntry>>
where
    R: TimetableRepository + ?Sized,
{
    bounded("list_all", limit, repo.list_all(user)).await
}

pub async fn timetables_by_group<R>(
    repo: &R,
    user: &UserId,
    group: &str,
    limit: Duration,
) -> RepositoryResult<Vec<StoredEntry>>
where
    R: TimetableRepository + ?Sized,
{
    bounded("find_by_group", limit, repo.find_by_group(user, group)).await
}

/// One entry by id; `NotFound` when the user has no such entry.
pub async fn get_timetable<R>(
    repo: &R,
    user: &UserId,
    id: &str,
    limit: Duration,
) -> RepositoryResult<StoredEntry>
where
    R: TimetableRepository + ?Sized,
{
    bounded("get_entry", limit, repo.get_entry(user, id)).await
}

// ==================== Purge ====================

/// Delete every entry of a user.
pub async fn purge_timetables<R>(repo: &R, user: &UserId, limit: Duration) -> RepositoryResult<usize>
where
    R: TimetableRepository + ?Sized,
{
    let deleted = bounded("delete_all", limit, repo.delete_all(user)).await?;
    info!("Purged {} timetable entries for user {}", deleted, user);
    Ok(deleted)
}
