//! In-memory local repository implementation.
//!
//! All entries live in a `HashMap` of per-user vectors behind a single lock,
//! so every write is applied atomically. The repository also offers fault
//! injection knobs (unhealthy store, rejected writes, failing probes,
//! artificial latency) used by the pipeline tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult, TimetableRepository};
use crate::models::{MatchFields, ScheduleEntry, StoredEntry, UserId};

/// In-memory local repository.
///
/// Cloning shares the underlying storage.
///
/// # Example
/// ```
/// use timetable_ingest::db::repositories::LocalRepository;
/// use timetable_ingest::db::repository::TimetableRepository;
/// use timetable_ingest::models::{ScheduleEntry, UserId};
///
/// # tokio_test_block(async {
/// let repo = LocalRepository::new();
/// let user = UserId::new("u1");
/// let ids = repo.batch_write(&user, &[ScheduleEntry::default()]).await.unwrap();
/// assert_eq!(ids.len(), 1);
/// assert_eq!(repo.entry_count(&user), 1);
/// # });
/// # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    faults: Arc<RwLock<FaultPlan>>,
    probe_calls: Arc<AtomicUsize>,
    write_calls: Arc<AtomicUsize>,
    probes: Arc<InFlight>,
}

/// Running and peak count of concurrent calls.
#[derive(Debug, Default)]
struct InFlight {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        InFlightGuard(self)
    }
}

/// Leaves the in-flight count on drop, including when the call is cancelled.
struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct LocalData {
    partitions: HashMap<UserId, Vec<StoredEntry>>,
}

/// Injected misbehaviour.
#[derive(Debug, Clone, Default)]
struct FaultPlan {
    unhealthy: bool,
    reject_writes: bool,
    fail_probes: bool,
    probe_latency: Option<Duration>,
    write_latency: Option<Duration>,
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.faults.write().unhealthy = !healthy;
    }

    /// Make every `batch_write` fail without persisting anything.
    pub fn set_reject_writes(&self, reject: bool) {
        self.faults.write().reject_writes = reject;
    }

    /// Make every `find_existing` fail.
    pub fn set_fail_probes(&self, fail: bool) {
        self.faults.write().fail_probes = fail;
    }

    /// Delay each probe before it reads the store.
    pub fn set_probe_latency(&self, latency: Option<Duration>) {
        self.faults.write().probe_latency = latency;
    }

    /// Delay each batch write before it mutates the store.
    pub fn set_write_latency(&self, latency: Option<Duration>) {
        self.faults.write().write_latency = latency;
    }

    /// Number of `find_existing` calls received so far.
    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    /// Number of `batch_write` calls received so far.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Number of stored entries for one user.
    pub fn entry_count(&self, user: &UserId) -> usize {
        self.data
            .read()
            .partitions
            .get(user)
            .map_or(0, Vec::len)
    }

    /// Seed a user partition directly, bypassing fault injection and counters.
    pub fn seed(&self, user: &UserId, entries: Vec<ScheduleEntry>) -> Vec<String> {
        let mut data = self.data.write();
        let partition = data.partitions.entry(user.clone()).or_default();
        entries
            .into_iter()
            .map(|entry| {
                let id = new_id();
                partition.push(StoredEntry {
                    id: id.clone(),
                    entry,
                });
                id
            })
            .collect()
    }

    /// Largest number of `find_existing` calls that were running at once.
    pub fn peak_concurrent_probes(&self) -> usize {
        self.probes.peak.load(Ordering::SeqCst)
    }

    fn faults(&self) -> FaultPlan {
        self.faults.read().clone()
    }

    fn check_health(&self, operation: &str, user: &UserId) -> RepositoryResult<()> {
        if self.faults.read().unhealthy {
            return Err(RepositoryError::ConnectionError {
                message: "Store is not healthy".to_string(),
                context: ErrorContext::new(operation).with_user(user).retryable(),
            });
        }
        Ok(())
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl TimetableRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(!self.faults.read().unhealthy)
    }

    async fn find_existing(
        &self,
        user: &UserId,
        fields: &MatchFields,
    ) -> RepositoryResult<Option<StoredEntry>> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = self.probes.enter();
        let faults = self.faults();
        if let Some(latency) = faults.probe_latency {
            tokio::time::sleep(latency).await;
        }
        self.check_health("find_existing", user)?;
        if faults.fail_probes {
            return Err(RepositoryError::query_with_context(
                "Existence probe failed",
                ErrorContext::new("find_existing").with_user(user),
            ));
        }

        let data = self.data.read();
        Ok(data
            .partitions
            .get(user)
            .and_then(|entries| entries.iter().find(|stored| fields.matches(&stored.entry)))
            .cloned())
    }

    async fn batch_write(
        &self,
        user: &UserId,
        entries: &[ScheduleEntry],
    ) -> RepositoryResult<Vec<String>> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let faults = self.faults();
        if let Some(latency) = faults.write_latency {
            tokio::time::sleep(latency).await;
        }
        self.check_health("batch_write", user)?;
        if faults.reject_writes {
            return Err(RepositoryError::transaction_with_context(
                "Batch write rejected",
                ErrorContext::new("batch_write")
                    .with_user(user)
                    .with_details(format!("entries={}", entries.len())),
            ));
        }

        let stored: Vec<StoredEntry> = entries
            .iter()
            .map(|entry| StoredEntry {
                id: new_id(),
                entry: entry.clone(),
            })
            .collect();
        let ids = stored.iter().map(|s| s.id.clone()).collect();

        self.data
            .write()
            .partitions
            .entry(user.clone())
            .or_default()
            .extend(stored);

        Ok(ids)
    }

    async fn list_all(&self, user: &UserId) -> RepositoryResult<Vec<StoredEntry>> {
        self.check_health("list_all", user)?;
        Ok(self
            .data
            .read()
            .partitions
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_by_group(
        &self,
        user: &UserId,
        group: &str,
    ) -> RepositoryResult<Vec<StoredEntry>> {
        self.check_health("find_by_group", user)?;
        let data = self.data.read();
        Ok(data
            .partitions
            .get(user)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|stored| stored.entry.group == group)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_entry(&self, user: &UserId, id: &str) -> RepositoryResult<StoredEntry> {
        self.check_health("get_entry", user)?;
        let data = self.data.read();
        data.partitions
            .get(user)
            .and_then(|entries| entries.iter().find(|stored| stored.id == id))
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("Timetable entry {} not found", id),
                    ErrorContext::new("get_entry").with_user(user).with_entry_id(id),
                )
            })
    }

    async fn delete_all(&self, user: &UserId) -> RepositoryResult<usize> {
        self.check_health("delete_all", user)?;
        Ok(self
            .data
            .write()
            .partitions
            .remove(user)
            .map_or(0, |entries| entries.len()))
    }
}
