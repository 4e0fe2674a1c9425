//! Atomic persistence of admitted entries.

use log::{info, warn};
use std::time::Duration;

use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult, TimetableRepository};
use crate::db::services::bounded;
use crate::models::{ScheduleEntry, UserId};

/// Identifiers assigned by a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub saved_ids: Vec<String>,
}

impl CommitReceipt {
    pub fn saved_count(&self) -> usize {
        self.saved_ids.len()
    }
}

/// Write all `entries` to the user's partition in a single batch.
///
/// An empty slice is a no-op that never contacts the store.
pub async fn commit<R>(
    repo: &R,
    user: &UserId,
    entries: &[ScheduleEntry],
    limit: Duration,
) -> RepositoryResult<CommitReceipt>
where
    R: TimetableRepository + ?Sized,
{
    if entries.is_empty() {
        return Ok(CommitReceipt::default());
    }

    let saved_ids = bounded("batch_write", limit, repo.batch_write(user, entries)).await?;
    if saved_ids.len() != entries.len() {
        warn!(
            "Store returned {} ids for {} entries of user {}",
            saved_ids.len(),
            entries.len(),
            user
        );
        return Err(RepositoryError::InternalError {
            message: "Batch write returned a mismatched id count".to_string(),
            context: ErrorContext::new("batch_write")
                .with_user(user)
                .with_details(format!("expected={}, got={}", entries.len(), saved_ids.len())),
        });
    }

    info!("Committed {} entries for user {}", saved_ids.len(), user);
    Ok(CommitReceipt { saved_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;

    #[tokio::test]
    async fn test_empty_commit_is_noop() {
        let repo = LocalRepository::new();
        let receipt = commit(&repo, &UserId::new("u1"), &[], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(receipt.saved_count(), 0);
        assert_eq!(repo.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_commit_returns_ids_in_order() {
        let repo = LocalRepository::new();
        let user = UserId::new("u1");
        let entries = vec![
            ScheduleEntry {
                group: "A".into(),
                ..Default::default()
            },
            ScheduleEntry {
                group: "B".into(),
                ..Default::default()
            },
        ];
        let receipt = commit(&repo, &user, &entries, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(receipt.saved_count(), 2);

        let stored = repo.list_all(&user).await.unwrap();
        assert_eq!(stored[0].id, receipt.saved_ids[0]);
        assert_eq!(stored[1].entry.group, "B");
    }

    #[tokio::test]
    async fn test_commit_timeout_persists_nothing() {
        let repo = LocalRepository::new();
        let user = UserId::new("u1");
        repo.set_write_latency(Some(Duration::from_millis(200)));

        let err = commit(
            &repo,
            &user,
            &[ScheduleEntry::default()],
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(repo.entry_count(&user), 0);
    }
}
