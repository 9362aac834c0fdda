//! coldvault - cold-storage lifecycle and reconciliation engine for document content
//!
//! Content records move between a hot tier (immediately readable) and a cold
//! archival tier (reads require an asynchronous retrieval). This crate owns
//! the per-record state machine, the reconciliation sweep that advances
//! pending retrievals, the propagation of transitions across records sharing
//! the same content, and the consistency guard on record mutations.

pub mod backend;
pub mod config;
pub mod guard;
pub mod jobs;
pub mod lifecycle;
pub mod notify;
pub mod observability;
pub mod propagation;
pub mod record;
pub mod rendition;
pub mod sweep;

pub use backend::{BackendStatus, StorageBackend};
pub use config::ColdStorageConfig;
pub use guard::{ConsistencyGuard, GuardedStore};
pub use jobs::{JobId, JobRunner, JobState, JobStatus};
pub use lifecycle::LifecycleEngine;
pub use notify::{LifecycleEvent, NotificationSink};
pub use propagation::{PropagationCoordinator, PropagationReport, PropagationRequest, Transition};
pub use record::{
    Content, ContentRecord, ContentState, LifecycleError, LifecycleErrorKind, LifecycleResult,
    Principal, RecordStore, RetrievalGoal,
};
pub use rendition::RenditionProvider;
pub use sweep::{DemotionSummary, ReconciliationSweeper, SweepSummary};
