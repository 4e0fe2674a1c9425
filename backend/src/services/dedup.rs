//! Duplicate filters.
//!
//! Two independent filters run in sequence: a key set scoped to one upload,
//! then an existence probe per surviving entry against the user's partition.

use futures::stream::{self, StreamExt, TryStreamExt};
use log::debug;
use std::collections::HashSet;
use std::time::Duration;

use crate::db::repository::{RepositoryResult, TimetableRepository};
use crate::db::services::bounded;
use crate::models::{ComparisonKey, ScheduleEntry, UserId};

/// Remembers the comparison keys seen so far in one upload.
#[derive(Debug, Default)]
pub struct BatchDeduplicator {
    seen: HashSet<ComparisonKey>,
}

impl BatchDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` the first time an entry's key is offered, `false` on repeats.
    pub fn admit(&mut self, entry: &ScheduleEntry) -> bool {
        self.seen.insert(entry.comparison_key())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Result of probing the store for already persisted entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Entries with no stored counterpart, in input order.
    pub admitted: Vec<ScheduleEntry>,
    pub persisted_duplicates: usize,
}

/// Probe the store for each entry and keep the ones not yet persisted.
///
/// At most `concurrency` probes are in flight; all of them have completed
/// when this returns. Any failed or timed-out probe fails the whole call.
pub async fn filter_persisted<R>(
    repo: &R,
    user: &UserId,
    entries: Vec<ScheduleEntry>,
    concurrency: usize,
    limit: Duration,
) -> RepositoryResult<ProbeOutcome>
where
    R: TimetableRepository + ?Sized,
{
    if entries.is_empty() {
        return Ok(ProbeOutcome::default());
    }

    // Each probe owns its user id and match fields so the futures stay Send
    // when the caller is spawned onto the runtime.
    let probes: Vec<_> = entries
        .iter()
        .map(|entry| {
            let user = user.clone();
            let fields = entry.match_fields();
            async move {
                bounded("find_existing", limit, repo.find_existing(&user, &fields))
                    .await
                    .map(|hit| hit.is_some())
            }
        })
        .collect();

    let found: Vec<bool> = stream::iter(probes)
        .buffered(concurrency.max(1))
    .try_collect()
    .await?;

    let mut outcome = ProbeOutcome::default();
    for (entry, exists) in entries.into_iter().zip(found) {
        if exists {
            debug!(
                "Entry {} already stored for user {}",
                entry.comparison_key().as_str(),
                user
            );
            outcome.persisted_duplicates += 1;
        } else {
            outcome.admitted.push(entry);
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;

    const LIMIT: Duration = Duration::from_secs(5);

    fn entry(group: &str, start: &str) -> ScheduleEntry {
        ScheduleEntry {
            group: group.into(),
            day: "Mon".into(),
            start_time: start.into(),
            end_time: "10:00".into(),
            class_name: "Math".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_dedup_uses_comparison_key() {
        let mut dedup = BatchDeduplicator::new();
        let first = entry("A", "09:00");
        let mut same_key = first.clone();
        same_key.room = "other".into();

        assert!(dedup.admit(&first));
        assert!(!dedup.admit(&same_key));
        assert!(dedup.admit(&entry("A", "10:00")));
        assert_eq!(dedup.len(), 2);
    }

    #[tokio::test]
    async fn test_filter_persisted_keeps_order() {
        let repo = LocalRepository::new();
        let user = UserId::new("u1");
        repo.seed(&user, vec![entry("B", "09:00")]);

        let outcome = filter_persisted(
            &repo,
            &user,
            vec![entry("A", "09:00"), entry("B", "09:00"), entry("C", "09:00")],
            2,
            LIMIT,
        )
        .await
        .unwrap();

        let groups: Vec<_> = outcome.admitted.iter().map(|e| e.group.as_str()).collect();
        assert_eq!(groups, vec!["A", "C"]);
        assert_eq!(outcome.persisted_duplicates, 1);
        assert_eq!(repo.probe_calls(), 3);
    }

    #[tokio::test]
    async fn test_probes_overlap_up_to_the_concurrency_limit() {
        let repo = LocalRepository::new();
        let user = UserId::new("u1");
        repo.set_probe_latency(Some(Duration::from_millis(50)));
        let entries: Vec<_> = (0..8).map(|hour| entry("A", &format!("{:02}:00", hour))).collect();

        let started = std::time::Instant::now();
        let outcome = filter_persisted(&repo, &user, entries, 4, LIMIT).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.admitted.len(), 8);
        assert_eq!(repo.probe_calls(), 8);
        assert_eq!(repo.peak_concurrent_probes(), 4);
        // Two waves of 50ms, far below eight probes one after another.
        assert!(elapsed < Duration::from_millis(300), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_concurrency_of_one_probes_serially() {
        let repo = LocalRepository::new();
        repo.set_probe_latency(Some(Duration::from_millis(5)));
        let entries = vec![entry("A", "09:00"), entry("B", "09:00"), entry("C", "09:00")];

        filter_persisted(&repo, &UserId::new("u1"), entries, 1, LIMIT)
            .await
            .unwrap();
        assert_eq!(repo.peak_concurrent_probes(), 1);
    }

    #[tokio::test]
    async fn test_failed_probe_is_not_a_miss() {
        let repo = LocalRepository::new();
        repo.set_fail_probes(true);
        let result =
            filter_persisted(&repo, &UserId::new("u1"), vec![entry("A", "09:00")], 8, LIMIT).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_input_skips_store() {
        let repo = LocalRepository::new();
        let outcome = filter_persisted(&repo, &UserId::new("u1"), Vec::new(), 8, LIMIT)
            .await
            .unwrap();
        assert!(outcome.admitted.is_empty());
        assert_eq!(repo.probe_calls(), 0);
    }
}
