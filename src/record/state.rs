//! Content Lifecycle State Machine
//!
//! States are explicit and enumerable. A record is either empty, hot, or
//! cold; the retrieval sub-state only exists while cold, so flag
//! combinations the system must never observe cannot be represented.
//!
//! Transitions are explicit methods, never inferred. Each consumes the
//! current state and either returns the next state or fails with a
//! forbidden-transition error, leaving the caller's copy untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::Content;
use super::errors::{LifecycleError, LifecycleResult};

/// Terminal goal of an in-flight retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalGoal {
    /// A temporary download window; the content stays cold afterwards.
    TemporaryAccess,
    /// A permanent restore back to hot storage once the backend delivers.
    PermanentRestore,
}

/// Lifecycle state of a record's primary content slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentState {
    /// The entity has not acquired content yet.
    Empty,

    /// Main content lives in hot storage and is immediately readable.
    Hot {
        /// The active content
        content: Content,
    },

    /// Main content was relocated to the cold archival tier. Readers see a
    /// placeholder rendition in the main slot.
    Cold {
        /// The archived content
        cold_content: Content,
        /// Placeholder shown in the main slot while cold
        placeholder: Content,
        /// In-flight retrieval, if any, with its terminal goal
        retrieving: Option<RetrievalGoal>,
        /// End of the temporary download window, once available
        downloadable_until: Option<DateTime<Utc>>,
        /// Whether the backend has confirmed the object reached the archive
        /// tier; the storage-class transition is applied asynchronously
        archived: bool,
    },
}

impl ContentState {
    /// Get the state name for observability.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Hot { .. } => "Hot",
            Self::Cold {
                retrieving: None, ..
            } => "Cold",
            Self::Cold {
                retrieving: Some(RetrievalGoal::TemporaryAccess),
                ..
            } => "ColdRetrieving",
            Self::Cold {
                retrieving: Some(RetrievalGoal::PermanentRestore),
                ..
            } => "ColdRestoring",
        }
    }

    /// Hot -> Cold
    ///
    /// The main content becomes the cold content; the given placeholder
    /// takes its place in the main slot.
    pub fn move_to_cold(self, placeholder: Content) -> LifecycleResult<Self> {
        match self {
            Self::Hot { content } => Ok(Self::Cold {
                cold_content: content,
                placeholder,
                retrieving: None,
                downloadable_until: None,
                archived: false,
            }),
            _ => Err(LifecycleError::forbidden_transition(
                self.state_name(),
                "Cold",
            )),
        }
    }

    /// Cold -> ColdRetrieving / ColdRestoring
    ///
    /// Records that a retrieval request was submitted to the backend. Only
    /// one retrieval may be outstanding, so this is forbidden while one is
    /// already in flight.
    pub fn begin_retrieval(self, goal: RetrievalGoal) -> LifecycleResult<Self> {
        match self {
            Self::Cold {
                cold_content,
                placeholder,
                retrieving: None,
                downloadable_until,
                archived,
            } => Ok(Self::Cold {
                cold_content,
                placeholder,
                retrieving: Some(goal),
                downloadable_until,
                archived,
            }),
            _ => Err(LifecycleError::forbidden_transition(
                self.state_name(),
                "ColdRetrieving",
            )),
        }
    }

    /// ColdRetrieving -> ColdRestoring
    ///
    /// Raises the restore goal on an already in-flight retrieval without
    /// re-submitting to the backend.
    pub fn escalate_to_restore(self) -> LifecycleResult<Self> {
        match self {
            Self::Cold {
                cold_content,
                placeholder,
                retrieving: Some(RetrievalGoal::TemporaryAccess),
                downloadable_until,
                archived,
            } => Ok(Self::Cold {
                cold_content,
                placeholder,
                retrieving: Some(RetrievalGoal::PermanentRestore),
                downloadable_until,
                archived,
            }),
            _ => Err(LifecycleError::forbidden_transition(
                self.state_name(),
                "ColdRestoring",
            )),
        }
    }

    /// ColdRetrieving -> Cold (temporarily downloadable)
    ///
    /// The backend delivered a temporary retrieval; the download window ends
    /// at `until`, when the backend reports one.
    pub fn mark_available(self, until: Option<DateTime<Utc>>) -> LifecycleResult<Self> {
        match self {
            Self::Cold {
                cold_content,
                placeholder,
                retrieving: Some(RetrievalGoal::TemporaryAccess),
                archived,
                ..
            } => Ok(Self::Cold {
                cold_content,
                placeholder,
                retrieving: None,
                downloadable_until: until,
                archived,
            }),
            _ => Err(LifecycleError::forbidden_transition(
                self.state_name(),
                "Cold",
            )),
        }
    }

    /// ColdRetrieving / ColdRestoring -> Cold
    ///
    /// The retrieval lapsed unobserved: the backend reports the object back
    /// in the archive tier with no ongoing restore. The flag is dropped so
    /// the record can be retrieved again.
    pub fn clear_retrieval(self) -> LifecycleResult<Self> {
        match self {
            Self::Cold {
                cold_content,
                placeholder,
                retrieving: Some(_),
                archived,
                ..
            } => Ok(Self::Cold {
                cold_content,
                placeholder,
                retrieving: None,
                downloadable_until: None,
                archived,
            }),
            _ => Err(LifecycleError::forbidden_transition(
                self.state_name(),
                "Cold",
            )),
        }
    }

    /// Cold (demotion pending) -> Cold (demotion confirmed)
    ///
    /// The backend reported the object in the archive tier, so the
    /// storage-class transition requested by the move has taken effect.
    pub fn confirm_archived(self) -> LifecycleResult<Self> {
        match self {
            Self::Cold {
                cold_content,
                placeholder,
                retrieving,
                downloadable_until,
                archived: false,
            } => Ok(Self::Cold {
                cold_content,
                placeholder,
                retrieving,
                downloadable_until,
                archived: true,
            }),
            _ => Err(LifecycleError::forbidden_transition(
                self.state_name(),
                "Cold",
            )),
        }
    }

    /// Cold (any sub-state) -> Hot
    ///
    /// Terminal restore: the cold content returns to the main slot and every
    /// cold-storage flag is cleared.
    pub fn apply_restore(self) -> LifecycleResult<Self> {
        match self {
            Self::Cold { cold_content, .. } => Ok(Self::Hot {
                content: cold_content,
            }),
            _ => Err(LifecycleError::forbidden_transition(
                self.state_name(),
                "Hot",
            )),
        }
    }
}

/// A content record: one per document's primary content slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Owning entity identifier
    pub id: Uuid,
    /// Lifecycle state of the primary content
    pub state: ContentState,
    /// Optimistic-concurrency token, bumped by the store on every put
    pub version: u64,
    /// True for a frozen prior version of another entity
    pub is_prior_version: bool,
    /// The live entity this record is a prior version of
    pub versionable_id: Option<Uuid>,
}

impl ContentRecord {
    /// Create a record for an entity that has not acquired content yet.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: ContentState::Empty,
            version: 0,
            is_prior_version: false,
            versionable_id: None,
        }
    }

    /// Create a record holding hot content.
    pub fn with_content(id: Uuid, content: Content) -> Self {
        Self {
            id,
            state: ContentState::Hot { content },
            version: 0,
            is_prior_version: false,
            versionable_id: None,
        }
    }

    /// Create a prior-version record of the given entity.
    pub fn prior_version_of(entity_id: Uuid, content: Content) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ContentState::Hot { content },
            version: 0,
            is_prior_version: true,
            versionable_id: Some(entity_id),
        }
    }

    /// Check if the main content was relocated to the cold tier.
    pub fn in_cold_storage(&self) -> bool {
        matches!(self.state, ContentState::Cold { .. })
    }

    /// Check if the backend has confirmed the archive-tier demotion.
    pub fn archive_confirmed(&self) -> bool {
        matches!(
            self.state,
            ContentState::Cold { archived: true, .. }
        )
    }

    /// Check if a retrieval request is outstanding.
    pub fn retrieval_in_progress(&self) -> bool {
        matches!(
            self.state,
            ContentState::Cold {
                retrieving: Some(_),
                ..
            }
        )
    }

    /// Check if the in-flight retrieval's terminal goal is a permanent restore.
    pub fn restore_requested(&self) -> bool {
        matches!(
            self.state,
            ContentState::Cold {
                retrieving: Some(RetrievalGoal::PermanentRestore),
                ..
            }
        )
    }

    /// The content a reader sees in the main slot.
    pub fn main_content(&self) -> Option<&Content> {
        match &self.state {
            ContentState::Empty => None,
            ContentState::Hot { content } => Some(content),
            ContentState::Cold { placeholder, .. } => Some(placeholder),
        }
    }

    /// The archived content, while cold.
    pub fn cold_content(&self) -> Option<&Content> {
        match &self.state {
            ContentState::Cold { cold_content, .. } => Some(cold_content),
            _ => None,
        }
    }

    /// Digest of the managed content: the cold content's while cold, the
    /// main content's otherwise.
    pub fn content_digest(&self) -> Option<&str> {
        match &self.state {
            ContentState::Empty => None,
            ContentState::Hot { content } => Some(&content.digest),
            ContentState::Cold { cold_content, .. } => Some(&cold_content.digest),
        }
    }

    /// End of the temporary download window, once a retrieval delivered.
    pub fn downloadable_until(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            ContentState::Cold {
                downloadable_until, ..
            } => *downloadable_until,
            _ => None,
        }
    }

    /// Apply a state transition, bumping nothing else.
    pub fn with_state(mut self, state: ContentState) -> Self {
        self.state = state;
        self
    }
}
