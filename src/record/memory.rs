//! In-Memory Record Store

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use uuid::Uuid;

use super::errors::{LifecycleError, LifecycleResult};
use super::state::ContentRecord;
use super::store::{Principal, RecordStore};

/// Reference store implementation backed by a record map.
///
/// Versions follow compare-and-swap semantics: `put` accepts a record only
/// at the version it was read at and stores it with the version bumped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<Uuid, ContentRecord>>,
    holds: RwLock<HashSet<Uuid>>,
    cold_write_grants: RwLock<HashSet<String>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, resetting its version. Test and seeding path,
    /// not subject to CAS.
    pub fn insert(&self, mut record: ContentRecord) -> ContentRecord {
        record.version = 0;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(record.id, record.clone());
        record
    }

    /// Put or remove a hold/retention flag on an entity.
    pub fn set_hold(&self, id: Uuid, held: bool) {
        let mut holds = self.holds.write().unwrap_or_else(|e| e.into_inner());
        if held {
            holds.insert(id);
        } else {
            holds.remove(&id);
        }
    }

    /// Grant the cold-storage-write permission to a principal name.
    pub fn grant_cold_write(&self, principal_name: impl Into<String>) {
        let mut grants = self
            .cold_write_grants
            .write()
            .unwrap_or_else(|e| e.into_inner());
        grants.insert(principal_name.into());
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for InMemoryStore {
    fn get(&self, id: Uuid) -> LifecycleResult<ContentRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records
            .get(&id)
            .cloned()
            .ok_or_else(|| LifecycleError::not_found(format!("no record for entity {}", id)))
    }

    fn put(&self, mut record: ContentRecord) -> LifecycleResult<ContentRecord> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let current = records
            .get(&record.id)
            .ok_or_else(|| LifecycleError::not_found(format!("no record for entity {}", record.id)))?;

        if current.version != record.version {
            return Err(LifecycleError::conflict(format!(
                "record {} was modified concurrently (expected version {}, found {})",
                record.id, record.version, current.version
            )));
        }

        record.version += 1;
        records.insert(record.id, record.clone());
        Ok(record)
    }

    fn find_retrieving(&self) -> LifecycleResult<Vec<ContentRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<ContentRecord> = records
            .values()
            .filter(|r| r.retrieval_in_progress())
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.id);
        Ok(matched)
    }

    fn find_unconfirmed_cold(&self) -> LifecycleResult<Vec<ContentRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<ContentRecord> = records
            .values()
            .filter(|r| r.in_cold_storage() && !r.archive_confirmed())
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.id);
        Ok(matched)
    }

    fn find_content_group(&self, digest: &str, seed: Uuid) -> LifecycleResult<Vec<ContentRecord>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<ContentRecord> = records
            .values()
            .filter(|r| r.id != seed)
            .filter(|r| r.content_digest() == Some(digest))
            .filter(|r| !r.is_prior_version || r.versionable_id == Some(seed))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.id);
        Ok(matched)
    }

    fn is_under_hold(&self, id: Uuid) -> LifecycleResult<bool> {
        let holds = self.holds.read().unwrap_or_else(|e| e.into_inner());
        Ok(holds.contains(&id))
    }

    fn can_write_cold(&self, principal: &Principal, _id: Uuid) -> LifecycleResult<bool> {
        if principal.system {
            return Ok(true);
        }
        let grants = self
            .cold_write_grants
            .read()
            .unwrap_or_else(|e| e.into_inner());
        Ok(grants.contains(&principal.name))
    }
}
