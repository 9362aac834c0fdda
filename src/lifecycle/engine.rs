//! Lifecycle transition operations
//!
//! One engine instance owns the sanctioned mutation path: it writes through
//! the raw store, below the consistency guard, and every transition is a
//! read-transform-put with compare-and-swap semantics in the put. A
//! transition therefore either lands exactly once or fails whole.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::config::ColdStorageConfig;
use crate::jobs::JobRunner;
use crate::notify::{LifecycleEvent, NotificationSink};
use crate::observability::Logger;
use crate::propagation::{PropagationRequest, Transition};
use crate::record::{
    ContentRecord, ContentState, LifecycleError, LifecycleErrorKind, LifecycleResult, Principal,
    RecordStore, RetrievalGoal,
};
use crate::rendition::RenditionProvider;

/// How one pending record advanced during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReconcileOutcome {
    /// The backend has not delivered the retrieval yet
    StillPending,
    /// A temporary retrieval was delivered; the record is downloadable
    BecameAvailable,
    /// A permanent restore completed; the record is hot again
    Restored,
    /// The backend lost the retrieval; the flag was cleared for a re-request
    RetrievalLapsed,
    /// Another actor advanced the record first
    AlreadyAdvanced,
}

/// Drives the hot/cold lifecycle of content records.
pub struct LifecycleEngine {
    store: Arc<dyn RecordStore>,
    backend: Arc<dyn StorageBackend>,
    renditions: Arc<dyn RenditionProvider>,
    events: Arc<dyn NotificationSink>,
    jobs: Arc<dyn JobRunner>,
    config: ColdStorageConfig,
}

impl LifecycleEngine {
    /// Create an engine over its collaborators. The store must be the raw,
    /// unguarded one.
    pub fn new(
        store: Arc<dyn RecordStore>,
        backend: Arc<dyn StorageBackend>,
        renditions: Arc<dyn RenditionProvider>,
        events: Arc<dyn NotificationSink>,
        jobs: Arc<dyn JobRunner>,
        config: ColdStorageConfig,
    ) -> Self {
        Self {
            store,
            backend,
            renditions,
            events,
            jobs,
            config,
        }
    }

    /// Move a record's main content to the cold tier.
    ///
    /// Re-invoking on an already-cold record is a safe no-op. Fails with
    /// `NotFound` when the record has no content, and `Forbidden` when the
    /// principal lacks the cold-storage-write permission or the record is
    /// under a hold.
    pub fn move_to_cold(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> LifecycleResult<ContentRecord> {
        let record = self.store.get(id)?;
        if !principal.system && !self.store.can_write_cold(principal, id)? {
            return Err(LifecycleError::forbidden(format!(
                "principal {} may not move record {} to cold storage",
                principal.name, id
            )));
        }

        if record.in_cold_storage() {
            Logger::debug("MOVE_TO_COLD_NOOP", &[("record_id", &id.to_string())]);
            return Ok(record);
        }
        if matches!(record.state, ContentState::Empty) {
            return Err(LifecycleError::not_found(format!(
                "record {} has no main content",
                id
            )));
        }
        if self.store.is_under_hold(id)? {
            return Err(LifecycleError::forbidden(format!(
                "record {} is under a hold or retention constraint",
                id
            )));
        }

        let placeholder = self.renditions.placeholder(id)?;
        let state = record.state.clone().move_to_cold(placeholder)?;
        let stored = self.store.put(record.with_state(state))?;

        Logger::info("MOVE_TO_COLD", &[("record_id", &id.to_string())]);
        self.events.publish(LifecycleEvent::Moved { record_id: id });
        self.submit_propagation(&stored, Transition::ToCold);
        Ok(stored)
    }

    /// Request a temporary retrieval of cold content, downloadable for
    /// `duration` once the backend delivers.
    ///
    /// Fails with `NotFound` when the record has nothing in cold storage
    /// and `Forbidden` when a retrieval is already outstanding. A failed or
    /// timed-out backend call leaves the record untouched.
    pub async fn request_retrieval(
        &self,
        principal: &Principal,
        id: Uuid,
        duration: Duration,
    ) -> LifecycleResult<ContentRecord> {
        if duration.is_zero() {
            return Err(LifecycleError::forbidden(
                "retrieval duration must be greater than zero",
            ));
        }

        let record = self.store.get(id)?;
        if record.retrieval_in_progress() {
            return Err(LifecycleError::forbidden(format!(
                "record {} is already being retrieved",
                id
            )));
        }
        let key = self.cold_key(&record).ok_or_else(|| {
            LifecycleError::not_found(format!("record {} has no content in cold storage", id))
        })?;

        self.backend_call(self.backend.initiate_restore(&key, duration))
            .await?;

        let state = record
            .state
            .clone()
            .begin_retrieval(RetrievalGoal::TemporaryAccess)?;
        let stored = self.store.put(record.with_state(state))?;

        Logger::info(
            "RETRIEVAL_REQUESTED",
            &[("principal", &principal.name), ("record_id", &id.to_string())],
        );
        self.events
            .publish(LifecycleEvent::RetrievalRequested { record_id: id });
        Ok(stored)
    }

    /// Request a permanent restore of cold content to hot storage.
    ///
    /// When the backend already has the bytes readable the restore completes
    /// synchronously. Otherwise the restore goal is recorded and a retrieval
    /// with the configured default window is submitted, unless one is
    /// already in flight, in which case only the goal is raised.
    ///
    /// Fails with `Forbidden` when the principal lacks the
    /// cold-storage-write permission and `Conflict` when the record is not
    /// cold or a restore was already requested.
    pub async fn request_restore(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> LifecycleResult<ContentRecord> {
        let record = self.store.get(id)?;
        if !principal.system && !self.store.can_write_cold(principal, id)? {
            return Err(LifecycleError::forbidden(format!(
                "principal {} may not restore record {} from cold storage",
                principal.name, id
            )));
        }
        if record.restore_requested() {
            return Err(LifecycleError::conflict(format!(
                "record {} is already being restored",
                id
            )));
        }
        let key = self.cold_key(&record).ok_or_else(|| {
            LifecycleError::conflict(format!("record {} is not in cold storage", id))
        })?;

        let status = self.backend_call(self.backend.status(&key)).await?;
        if status.is_retrieved() {
            return self.finish_restore(record);
        }

        if record.retrieval_in_progress() {
            // a temporary retrieval is in flight; raise its goal without
            // double-submitting to the backend
            let state = record.state.clone().escalate_to_restore()?;
            let stored = self.store.put(record.with_state(state))?;
            Logger::info("RESTORE_GOAL_RAISED", &[("record_id", &id.to_string())]);
            return Ok(stored);
        }

        self.backend_call(
            self.backend
                .initiate_restore(&key, self.config.default_availability()),
        )
        .await?;

        let state = record
            .state
            .clone()
            .begin_retrieval(RetrievalGoal::PermanentRestore)?;
        let stored = self.store.put(record.with_state(state))?;

        Logger::info(
            "RESTORE_REQUESTED",
            &[("principal", &principal.name), ("record_id", &id.to_string())],
        );
        self.events
            .publish(LifecycleEvent::RetrievalRequested { record_id: id });
        Ok(stored)
    }

    /// Re-evaluate one record against the backend outside the sweep.
    ///
    /// Returns whether the pending retrieval was delivered by this check
    /// (either as a download window or as a completed restore).
    pub async fn check_single(&self, id: Uuid) -> LifecycleResult<bool> {
        let outcome = self.reconcile(id).await?;
        Logger::debug(
            "CHECK_SINGLE",
            &[
                ("outcome", &format!("{:?}", outcome)),
                ("record_id", &id.to_string()),
            ],
        );
        Ok(matches!(
            outcome,
            ReconcileOutcome::BecameAvailable | ReconcileOutcome::Restored
        ))
    }

    /// All records with a retrieval outstanding, for the sweep.
    pub(crate) fn pending_retrievals(&self) -> LifecycleResult<Vec<ContentRecord>> {
        self.store.find_retrieving()
    }

    /// All cold records still awaiting demotion confirmation, for the sweep.
    pub(crate) fn unconfirmed_demotions(&self) -> LifecycleResult<Vec<ContentRecord>> {
        self.store.find_unconfirmed_cold()
    }

    /// Verify one moved record against the backend's reported tier.
    ///
    /// The backend applies the storage-class transition asynchronously, so
    /// a record can sit cold for a while before the backend reports the
    /// object in the archive tier. Returns whether this call confirmed the
    /// demotion.
    pub(crate) async fn confirm_demotion(&self, id: Uuid) -> LifecycleResult<bool> {
        let record = self.store.get(id)?;
        if !record.in_cold_storage() || record.archive_confirmed() {
            return Ok(false);
        }
        let key = self.cold_key(&record).ok_or_else(|| {
            LifecycleError::internal(format!("record {} is cold without cold content", id))
        })?;

        let status = self.backend_call(self.backend.status(&key)).await?;
        if status.storage_class.is_none() {
            return Ok(false);
        }

        let state = record.state.clone().confirm_archived()?;
        match self.store.put(record.with_state(state)) {
            Ok(_) => {
                Logger::info("DEMOTION_CONFIRMED", &[("record_id", &id.to_string())]);
                Ok(true)
            }
            Err(e) if e.kind == LifecycleErrorKind::Conflict => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Advance one pending record from the backend's current status.
    ///
    /// Re-entrant: a concurrent sweep or check that advanced the record
    /// first shows up as a lost compare-and-swap and is reported as
    /// `AlreadyAdvanced`, never re-processed.
    pub(crate) async fn reconcile(&self, id: Uuid) -> LifecycleResult<ReconcileOutcome> {
        let record = self.store.get(id)?;
        if !record.retrieval_in_progress() {
            return Ok(ReconcileOutcome::AlreadyAdvanced);
        }
        let key = self.cold_key(&record).ok_or_else(|| {
            LifecycleError::internal(format!(
                "record {} is retrieving without cold content",
                id
            ))
        })?;
        let status = self.backend_call(self.backend.status(&key)).await?;

        if status.is_retrieved() {
            if record.restore_requested() {
                return match self.finish_restore(record) {
                    Ok(_) => Ok(ReconcileOutcome::Restored),
                    Err(e) if e.kind == LifecycleErrorKind::Conflict => {
                        Ok(ReconcileOutcome::AlreadyAdvanced)
                    }
                    Err(e) => Err(e),
                };
            }

            let until = status.downloadable_until;
            let download_ref = record
                .cold_content()
                .map(|c| format!("/download/{}/{}", record.id, c.filename))
                .unwrap_or_default();
            let state = record.state.clone().mark_available(until)?;
            return match self.store.put(record.with_state(state)) {
                Ok(_) => {
                    Logger::info("RETRIEVAL_AVAILABLE", &[("record_id", &id.to_string())]);
                    self.events.publish(LifecycleEvent::Available {
                        record_id: id,
                        downloadable_until: until,
                        download_ref,
                    });
                    Ok(ReconcileOutcome::BecameAvailable)
                }
                Err(e) if e.kind == LifecycleErrorKind::Conflict => {
                    Ok(ReconcileOutcome::AlreadyAdvanced)
                }
                Err(e) => Err(e),
            };
        }

        if !status.downloadable && !status.ongoing_restore {
            // the backend lost or expired the retrieval without the window
            // ever being observed; clear the flag so it can be re-requested
            let state = record.state.clone().clear_retrieval()?;
            return match self.store.put(record.with_state(state)) {
                Ok(_) => {
                    Logger::warn("RETRIEVAL_LAPSED", &[("record_id", &id.to_string())]);
                    Ok(ReconcileOutcome::RetrievalLapsed)
                }
                Err(e) if e.kind == LifecycleErrorKind::Conflict => {
                    Ok(ReconcileOutcome::AlreadyAdvanced)
                }
                Err(e) => Err(e),
            };
        }

        Ok(ReconcileOutcome::StillPending)
    }

    /// Terminal restore: cold content returns to the main slot, siblings
    /// follow through a propagation job.
    fn finish_restore(&self, record: ContentRecord) -> LifecycleResult<ContentRecord> {
        let record_id = record.id;
        let state = record.state.clone().apply_restore()?;
        let stored = self.store.put(record.with_state(state))?;

        Logger::info("RESTORE_COMPLETE", &[("record_id", &record_id.to_string())]);
        self.events
            .publish(LifecycleEvent::Restored { record_id });
        self.submit_propagation(&stored, Transition::ToHot);
        Ok(stored)
    }

    /// Key of the archived content, while the record is cold.
    fn cold_key(&self, record: &ContentRecord) -> Option<String> {
        record.cold_content().map(|c| c.key.clone())
    }

    /// Fire-and-forget submission of a propagation job for the record's
    /// content group. Submission failure is logged, never surfaced.
    fn submit_propagation(&self, record: &ContentRecord, transition: Transition) {
        let Some(digest) = record.content_digest() else {
            return;
        };
        let request = PropagationRequest {
            seed: record.id,
            digest: digest.to_string(),
            transition,
        };
        if let Err(e) = self.jobs.submit(request) {
            Logger::error(
                "PROPAGATION_SUBMIT_FAILED",
                &[
                    ("error", &e.to_string()),
                    ("record_id", &record.id.to_string()),
                ],
            );
        }
    }

    /// Apply the configured timeout to one backend call. A timed-out call
    /// maps to `Internal` before any record state changes (fail closed).
    async fn backend_call<T>(
        &self,
        call: impl Future<Output = LifecycleResult<T>>,
    ) -> LifecycleResult<T> {
        match timeout(self.config.backend_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(LifecycleError::internal("storage backend call timed out")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    use crate::backend::InMemoryBackend;
    use crate::jobs::InlineJobRunner;
    use crate::notify::RecordingSink;
    use crate::propagation::PropagationCoordinator;
    use crate::record::{Content, InMemoryStore};
    use crate::rendition::StaticRenditionProvider;

    struct Fixture {
        store: Arc<InMemoryStore>,
        backend: Arc<InMemoryBackend>,
        events: Arc<RecordingSink>,
        engine: LifecycleEngine,
    }

    fn fixture() -> Fixture {
        fixture_with(ColdStorageConfig::default())
    }

    fn fixture_with(config: ColdStorageConfig) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let backend = Arc::new(InMemoryBackend::new());
        let events = Arc::new(RecordingSink::new());
        let renditions = Arc::new(StaticRenditionProvider::with_default(Content::from_bytes(
            "thumb",
            "thumb.png",
            b"thumb",
        )));
        let coordinator = PropagationCoordinator::new(
            store.clone(),
            renditions.clone(),
            events.clone(),
        );
        let jobs = Arc::new(InlineJobRunner::new(coordinator));
        let engine = LifecycleEngine::new(
            store.clone(),
            backend.clone(),
            renditions,
            events.clone(),
            jobs,
            config,
        );
        Fixture {
            store,
            backend,
            events,
            engine,
        }
    }

    fn content(key: &str) -> Content {
        Content::from_bytes(key, "file.bin", key.as_bytes())
    }

    fn seeded_hot(fx: &Fixture, key: &str) -> ContentRecord {
        fx.backend.put_hot(key);
        fx.store
            .insert(ContentRecord::with_content(Uuid::new_v4(), content(key)))
    }

    fn five_days() -> Duration {
        Duration::from_secs(5 * 86_400)
    }

    #[tokio::test]
    async fn test_move_to_cold() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");

        let moved = fx
            .engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();

        assert!(moved.in_cold_storage());
        assert_eq!(moved.cold_content().unwrap().key, "main");
        assert_eq!(moved.main_content().unwrap().key, "thumb");
        assert_eq!(fx.events.published_named("COLD_CONTENT_MOVED").len(), 1);
    }

    #[tokio::test]
    async fn test_move_to_cold_is_idempotent() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");

        let first = fx
            .engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        let second = fx
            .engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(fx.events.published_named("COLD_CONTENT_MOVED").len(), 1);
    }

    #[tokio::test]
    async fn test_move_to_cold_requires_permission() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");

        let err = fx
            .engine
            .move_to_cold(&Principal::user("mallory"), record.id)
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        fx.store.grant_cold_write("alice");
        assert!(fx
            .engine
            .move_to_cold(&Principal::user("alice"), record.id)
            .is_ok());
    }

    #[tokio::test]
    async fn test_move_noop_still_requires_permission() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();

        // re-invocation on a cold record must not leak its state to a
        // principal that could not have moved it
        let err = fx
            .engine
            .move_to_cold(&Principal::user("mallory"), record.id)
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_move_to_cold_rejects_held_records() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.store.set_hold(record.id, true);

        let err = fx
            .engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert!(!fx.store.get(record.id).unwrap().in_cold_storage());
    }

    #[tokio::test]
    async fn test_move_to_cold_without_content_is_not_found() {
        let fx = fixture();
        let record = fx.store.insert(ContentRecord::new(Uuid::new_v4()));

        let err = fx
            .engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_move_to_cold_propagates_to_duplicates() {
        let fx = fixture();
        let record = seeded_hot(&fx, "shared");
        let duplicate = fx
            .store
            .insert(ContentRecord::with_content(Uuid::new_v4(), content("shared")));

        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();

        assert!(fx.store.get(duplicate.id).unwrap().in_cold_storage());
    }

    #[tokio::test]
    async fn test_request_retrieval() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");

        let retrieving = fx
            .engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap();

        assert!(retrieving.retrieval_in_progress());
        assert!(!retrieving.restore_requested());
        assert!(fx.backend.status("main").await.unwrap().ongoing_restore);
        assert_eq!(
            fx.events
                .published_named("COLD_CONTENT_RETRIEVAL_REQUESTED")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_request_retrieval_rejects_zero_duration() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();

        let err = fx
            .engine
            .request_retrieval(&Principal::system(), record.id, Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_request_retrieval_rejects_duplicate() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");

        fx.engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap();
        let err = fx
            .engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_retrieval_of_hot_record_is_not_found() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");

        let err = fx
            .engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_restore_of_hot_record_is_conflict() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");

        let err = fx
            .engine
            .request_restore(&Principal::system(), record.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_request_restore_requires_permission() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();

        let err = fx
            .engine
            .request_restore(&Principal::user("mallory"), record.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert!(fx.store.get(record.id).unwrap().in_cold_storage());

        fx.store.grant_cold_write("alice");
        let restored = fx
            .engine
            .request_restore(&Principal::user("alice"), record.id)
            .await
            .unwrap();
        assert!(!restored.in_cold_storage());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_timeout_fails_closed() {
        let fx = fixture_with(ColdStorageConfig {
            backend_timeout_secs: 1,
            ..ColdStorageConfig::default()
        });
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");
        fx.backend.set_latency(Duration::from_secs(10));

        let err = fx
            .engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert!(!fx.store.get(record.id).unwrap().retrieval_in_progress());
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_record_untouched() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");
        fx.backend.fail_next("main");

        let err = fx
            .engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(!fx.store.get(record.id).unwrap().retrieval_in_progress());
    }

    #[tokio::test]
    async fn test_request_restore_immediate_when_downloadable() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        let before = fx.store.get(record.id).unwrap().main_content().cloned();
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();

        // the backend never demoted the object, so the bytes are readable
        let restored = fx.engine.request_restore(&Principal::system(), record.id).await.unwrap();

        assert!(!restored.in_cold_storage());
        assert_eq!(restored.main_content().cloned(), before);
        assert!(restored.cold_content().is_none());
        assert_eq!(fx.events.published_named("COLD_CONTENT_RESTORED").len(), 1);
    }

    #[tokio::test]
    async fn test_request_restore_submits_retrieval_when_archived() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");

        let restoring = fx.engine.request_restore(&Principal::system(), record.id).await.unwrap();

        assert!(restoring.in_cold_storage());
        assert!(restoring.restore_requested());
        assert!(fx.backend.status("main").await.unwrap().ongoing_restore);
    }

    #[tokio::test]
    async fn test_request_restore_escalates_in_flight_retrieval() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");
        fx.engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap();

        let restoring = fx.engine.request_restore(&Principal::system(), record.id).await.unwrap();

        assert!(restoring.restore_requested());
        // only one retrieval-requested event: no second backend submission
        assert_eq!(
            fx.events
                .published_named("COLD_CONTENT_RETRIEVAL_REQUESTED")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_request_restore_rejects_duplicate() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");
        fx.engine.request_restore(&Principal::system(), record.id).await.unwrap();

        let err = fx.engine.request_restore(&Principal::system(), record.id).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_check_single_marks_available() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");
        fx.engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap();

        let until = Utc::now() + ChronoDuration::days(5);
        fx.backend.complete_restore("main", Some(until));

        assert!(fx.engine.check_single(record.id).await.unwrap());

        let checked = fx.store.get(record.id).unwrap();
        assert!(!checked.retrieval_in_progress());
        assert_eq!(checked.downloadable_until(), Some(until));

        let available = fx.events.published_named("COLD_CONTENT_AVAILABLE");
        assert_eq!(available.len(), 1);
        match &available[0] {
            LifecycleEvent::Available { download_ref, .. } => {
                assert_eq!(download_ref, &format!("/download/{}/file.bin", record.id));
            }
            _ => panic!("expected Available"),
        }
    }

    #[tokio::test]
    async fn test_check_single_completes_pending_restore() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");
        fx.engine.request_restore(&Principal::system(), record.id).await.unwrap();
        fx.backend.complete_restore("main", Some(Utc::now()));

        assert!(fx.engine.check_single(record.id).await.unwrap());

        let restored = fx.store.get(record.id).unwrap();
        assert!(!restored.in_cold_storage());
        assert_eq!(restored.main_content().unwrap().key, "main");
    }

    #[tokio::test]
    async fn test_check_single_clears_lapsed_retrieval() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");
        fx.engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap();
        fx.backend.expire_restore("main");

        assert!(!fx.engine.check_single(record.id).await.unwrap());

        let cleared = fx.store.get(record.id).unwrap();
        assert!(cleared.in_cold_storage());
        assert!(!cleared.retrieval_in_progress());

        // the record can be retrieved again
        assert!(fx
            .engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_check_single_still_pending() {
        let fx = fixture();
        let record = seeded_hot(&fx, "main");
        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        fx.backend.archive("main");
        fx.engine
            .request_retrieval(&Principal::system(), record.id, five_days())
            .await
            .unwrap();

        assert!(!fx.engine.check_single(record.id).await.unwrap());
        assert!(fx.store.get(record.id).unwrap().retrieval_in_progress());
        assert!(fx.events.published_named("COLD_CONTENT_AVAILABLE").is_empty());
    }

    #[tokio::test]
    async fn test_restore_propagates_to_duplicates() {
        let fx = fixture();
        let record = seeded_hot(&fx, "shared");
        let duplicate = fx
            .store
            .insert(ContentRecord::with_content(Uuid::new_v4(), content("shared")));

        fx.engine
            .move_to_cold(&Principal::system(), record.id)
            .unwrap();
        assert!(fx.store.get(duplicate.id).unwrap().in_cold_storage());

        fx.engine.request_restore(&Principal::system(), record.id).await.unwrap();

        let sibling = fx.store.get(duplicate.id).unwrap();
        assert!(!sibling.in_cold_storage());
        assert_eq!(sibling.main_content().unwrap().key, "shared");
    }
}
