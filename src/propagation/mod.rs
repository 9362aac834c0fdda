//! # Propagation Coordinator
//!
//! Fans a lifecycle transition out to every record sharing the seed's
//! content digest (duplicates and prior versions of the seed entity). The
//! fan-out is a trusted, internally-authorized mutation: permission and
//! hold checks were already made on the seed, and are not re-run per
//! sibling. One record's failure is counted and logged; it never stops the
//! remainder and nothing is rolled back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notify::{LifecycleEvent, NotificationSink};
use crate::observability::Logger;
use crate::record::{ContentRecord, LifecycleResult, RecordStore};
use crate::rendition::RenditionProvider;

/// The transition being propagated to a content group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// The seed's content moved to the cold tier
    ToCold,
    /// The seed's content was restored to hot storage
    ToHot,
}

/// A propagation job scoped to a seed record's content group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationRequest {
    /// The record whose transition is being fanned out; excluded from the group
    pub seed: Uuid,
    /// The content digest defining the group
    pub digest: String,
    /// The transition to apply
    pub transition: Transition,
}

/// Outcome of one propagation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Records transitioned by this run
    pub processed: u64,
    /// Records already in the target state (idempotent no-ops)
    pub skipped: u64,
    /// Records that failed; logged, never retried by this run
    pub errors: u64,
}

/// Applies propagated transitions to content groups.
pub struct PropagationCoordinator {
    store: Arc<dyn RecordStore>,
    renditions: Arc<dyn RenditionProvider>,
    events: Arc<dyn NotificationSink>,
}

impl PropagationCoordinator {
    /// Create a coordinator writing through the given (non-guarded) store.
    pub fn new(
        store: Arc<dyn RecordStore>,
        renditions: Arc<dyn RenditionProvider>,
        events: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            renditions,
            events,
        }
    }

    /// Run one propagation job to completion.
    pub fn run(&self, request: &PropagationRequest) -> LifecycleResult<PropagationReport> {
        Logger::debug(
            "PROPAGATION_BEGIN",
            &[
                ("digest", &request.digest),
                ("seed", &request.seed.to_string()),
            ],
        );

        let group = self
            .store
            .find_content_group(&request.digest, request.seed)?;

        let mut report = PropagationReport::default();
        for record in group {
            let record_id = record.id;
            match self.apply(record, request.transition) {
                Ok(true) => report.processed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.errors += 1;
                    Logger::warn(
                        "PROPAGATION_RECORD_FAILED",
                        &[
                            ("error", &e.to_string()),
                            ("record_id", &record_id.to_string()),
                        ],
                    );
                }
            }
        }

        Logger::debug(
            "PROPAGATION_COMPLETE",
            &[
                ("errors", &report.errors.to_string()),
                ("processed", &report.processed.to_string()),
                ("skipped", &report.skipped.to_string()),
            ],
        );
        Ok(report)
    }

    /// Apply the transition to one sibling. `Ok(false)` means the record was
    /// already in the target state, so re-running a propagation (the batch
    /// path racing the seed or sweep path) is a no-op.
    fn apply(&self, record: ContentRecord, transition: Transition) -> LifecycleResult<bool> {
        match transition {
            Transition::ToCold => {
                if record.in_cold_storage() {
                    return Ok(false);
                }
                let placeholder = self.renditions.placeholder(record.id)?;
                let state = record.state.clone().move_to_cold(placeholder)?;
                self.store.put(record.with_state(state))?;
                Ok(true)
            }
            Transition::ToHot => {
                if !record.in_cold_storage() {
                    return Ok(false);
                }
                let record_id = record.id;
                let state = record.state.clone().apply_restore()?;
                self.store.put(record.with_state(state))?;
                self.events
                    .publish(LifecycleEvent::Restored { record_id });
                Ok(true)
            }
        }
    }
}
