//! In-Memory Archive Backend

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{BackendStatus, StorageBackend};
use crate::record::{LifecycleError, LifecycleResult};

/// Backend simulating an object-storage archive class.
///
/// Objects start hot; `archive` demotes them. A retrieval request flags an
/// ongoing restore which a test drives to completion with
/// `complete_restore`, and `expire_restore` sends an object back behind the
/// archive wall.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    objects: RwLock<HashMap<String, BackendStatus>>,
    /// Keys for which the next call fails, to exercise error paths
    failing: RwLock<Vec<String>>,
    /// Artificial per-call latency, to exercise timeout paths
    latency: RwLock<Option<Duration>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object still in the hot tier.
    pub fn put_hot(&self, key: impl Into<String>) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            key.into(),
            BackendStatus {
                storage_class: None,
                downloadable: true,
                downloadable_until: None,
                ongoing_restore: false,
            },
        );
    }

    /// Demote an object to the archive tier.
    pub fn archive(&self, key: impl Into<String>) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            key.into(),
            BackendStatus {
                storage_class: Some("ARCHIVE".to_string()),
                downloadable: false,
                downloadable_until: None,
                ongoing_restore: false,
            },
        );
    }

    /// Deliver a pending retrieval: the object becomes temporarily
    /// downloadable until the given instant.
    pub fn complete_restore(&self, key: &str, until: Option<DateTime<Utc>>) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        if let Some(status) = objects.get_mut(key) {
            status.downloadable = true;
            status.downloadable_until = until;
            status.ongoing_restore = false;
        }
    }

    /// Expire a delivered retrieval: the object goes back behind the
    /// archive wall with no restore in flight.
    pub fn expire_restore(&self, key: &str) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        if let Some(status) = objects.get_mut(key) {
            status.downloadable = false;
            status.downloadable_until = None;
            status.ongoing_restore = false;
        }
    }

    /// Make the next call for `key` fail.
    pub fn fail_next(&self, key: impl Into<String>) {
        let mut failing = self.failing.write().unwrap_or_else(|e| e.into_inner());
        failing.push(key.into());
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let mut slot = self.latency.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(latency);
    }

    async fn simulate_latency(&self) {
        let latency = {
            let slot = self.latency.read().unwrap_or_else(|e| e.into_inner());
            *slot
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn take_failure(&self, key: &str) -> bool {
        let mut failing = self.failing.write().unwrap_or_else(|e| e.into_inner());
        if let Some(pos) = failing.iter().position(|k| k == key) {
            failing.remove(pos);
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn status(&self, key: &str) -> LifecycleResult<BackendStatus> {
        self.simulate_latency().await;
        if self.take_failure(key) {
            return Err(LifecycleError::internal(format!(
                "backend unavailable for object {}",
                key
            )));
        }
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| LifecycleError::not_found(format!("no backend object for key {}", key)))
    }

    async fn initiate_restore(&self, key: &str, _duration: Duration) -> LifecycleResult<()> {
        self.simulate_latency().await;
        if self.take_failure(key) {
            return Err(LifecycleError::internal(format!(
                "backend unavailable for object {}",
                key
            )));
        }
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        let status = objects
            .get_mut(key)
            .ok_or_else(|| LifecycleError::not_found(format!("no backend object for key {}", key)))?;
        status.ongoing_restore = true;
        Ok(())
    }
}
