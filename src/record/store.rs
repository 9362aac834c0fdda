//! Record Store Trait

use uuid::Uuid;

use super::errors::LifecycleResult;
use super::state::ContentRecord;

/// Acting principal for lifecycle operations. Authorization itself is
/// delegated to the owning store; the engine only carries the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Principal name
    pub name: String,
    /// System principals bypass permission checks (internal propagation)
    pub system: bool,
}

impl Principal {
    /// Create a regular user principal.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: false,
        }
    }

    /// Create the internal system principal.
    pub fn system() -> Self {
        Self {
            name: "system".to_string(),
            system: true,
        }
    }
}

/// Store trait for content records
///
/// Mutation is serialized at the record level through optimistic
/// concurrency: `put` succeeds only when the submitted record's version
/// matches the stored one, and fails with `Conflict` otherwise.
pub trait RecordStore: Send + Sync {
    /// Point read; `NotFound` when the record does not exist.
    fn get(&self, id: Uuid) -> LifecycleResult<ContentRecord>;

    /// Conditional write. Returns the stored record with its bumped version.
    fn put(&self, record: ContentRecord) -> LifecycleResult<ContentRecord>;

    /// All records with a retrieval request outstanding.
    fn find_retrieving(&self) -> LifecycleResult<Vec<ContentRecord>>;

    /// All cold records whose archive-tier demotion the backend has not
    /// confirmed yet.
    fn find_unconfirmed_cold(&self) -> LifecycleResult<Vec<ContentRecord>>;

    /// The content group of a seed record: every other record sharing the
    /// digest, plus prior versions of the seed entity with that digest.
    fn find_content_group(&self, digest: &str, seed: Uuid) -> LifecycleResult<Vec<ContentRecord>>;

    /// Hold/retention predicate for the owning entity.
    fn is_under_hold(&self, id: Uuid) -> LifecycleResult<bool>;

    /// Cold-storage-write permission predicate for the acting principal.
    fn can_write_cold(&self, principal: &Principal, id: Uuid) -> LifecycleResult<bool>;
}
