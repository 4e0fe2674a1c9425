//! Per-user upload serialization.
//!
//! Uploads of one user hold that user's lock from the first existence probe
//! until the commit resolves. Uploads of different users never contend.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::UserId;

/// Registry of per-user async locks.
#[derive(Clone, Default)]
pub struct UploadLocks {
    locks: Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>,
}

/// Held while an upload probes and commits. Releases on drop.
pub struct UploadGuard {
    _guard: OwnedMutexGuard<()>,
}

impl UploadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the user's lock.
    pub async fn acquire(&self, user: &UserId) -> UploadGuard {
        let lock = {
            let mut locks = self.locks.lock();
            // Locks nobody holds or waits for are dropped.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(user.clone()).or_default().clone()
        };
        UploadGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of users with a live lock entry.
    pub fn tracked_users(&self) -> usize {
        self.locks.lock().len()
    }
}
