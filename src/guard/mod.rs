//! # Consistency Guard
//!
//! Intercepts record mutations arriving from outside the lifecycle engine
//! and rejects edits that would corrupt cold-storage bookkeeping. While a
//! record is cold its archived content and placeholder are frozen; only
//! the engine and the propagation jobs, which write through the unguarded
//! store, may change them.

use std::sync::Arc;

use uuid::Uuid;

use crate::record::{
    ContentRecord, ContentState, LifecycleError, LifecycleResult, Principal, RecordStore,
};

/// Validates external mutations of cold records.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsistencyGuard;

impl ConsistencyGuard {
    /// Check one proposed mutation. `previous` is the currently stored
    /// record, `updated` the record as the caller wants it written.
    pub fn check_update(
        &self,
        previous: &ContentRecord,
        updated: &ContentRecord,
    ) -> LifecycleResult<()> {
        let ContentState::Cold {
            cold_content,
            placeholder,
            ..
        } = &previous.state
        else {
            return Ok(());
        };

        match &updated.state {
            ContentState::Cold {
                cold_content: new_cold,
                placeholder: new_placeholder,
                ..
            } => {
                if new_cold != cold_content {
                    return Err(LifecycleError::forbidden(format!(
                        "record {} is in cold storage; its archived content cannot be modified",
                        previous.id
                    )));
                }
                if new_placeholder != placeholder {
                    return Err(LifecycleError::forbidden(format!(
                        "record {} is in cold storage; its placeholder cannot be modified",
                        previous.id
                    )));
                }
                Ok(())
            }
            _ => Err(LifecycleError::forbidden(format!(
                "record {} is in cold storage; its content cannot be replaced or removed",
                previous.id
            ))),
        }
    }
}

/// Store wrapper applying the guard to every external write.
pub struct GuardedStore {
    inner: Arc<dyn RecordStore>,
    guard: ConsistencyGuard,
}

impl GuardedStore {
    /// Wrap a store so that all writes through this handle are checked.
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            guard: ConsistencyGuard,
        }
    }
}

impl RecordStore for GuardedStore {
    fn get(&self, id: Uuid) -> LifecycleResult<ContentRecord> {
        self.inner.get(id)
    }

    fn put(&self, record: ContentRecord) -> LifecycleResult<ContentRecord> {
        let previous = self.inner.get(record.id)?;
        self.guard.check_update(&previous, &record)?;
        self.inner.put(record)
    }

    fn find_retrieving(&self) -> LifecycleResult<Vec<ContentRecord>> {
        self.inner.find_retrieving()
    }

    fn find_unconfirmed_cold(&self) -> LifecycleResult<Vec<ContentRecord>> {
        self.inner.find_unconfirmed_cold()
    }

    fn find_content_group(&self, digest: &str, seed: Uuid) -> LifecycleResult<Vec<ContentRecord>> {
        self.inner.find_content_group(digest, seed)
    }

    fn is_under_hold(&self, id: Uuid) -> LifecycleResult<bool> {
        self.inner.is_under_hold(id)
    }

    fn can_write_cold(&self, principal: &Principal, id: Uuid) -> LifecycleResult<bool> {
        self.inner.can_write_cold(principal, id)
    }
}
