//! # Reconciliation Sweeper
//!
//! Periodically turns backend eventual-consistency into record state: every
//! record with a retrieval outstanding is checked against the backend and
//! advanced when the retrieval was delivered. The sweep is stateless and
//! safe to re-trigger at any time; records advanced by a concurrent sweep
//! or check are detected through the store's conditional writes and never
//! double-processed.
//!
//! Backend calls dominate sweep latency, so records are checked in parallel
//! under a bounded concurrency limit rather than serialized behind the
//! slowest one.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::lifecycle::{LifecycleEngine, ReconcileOutcome};
use crate::observability::Logger;
use crate::record::LifecycleResult;

/// Aggregate outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Records whose retrieval the backend has not delivered yet, including
    /// records skipped because their backend check failed
    pub still_pending: u64,
    /// Records that became downloadable or finished restoring this sweep
    pub became_available: u64,
}

/// Aggregate outcome of one demotion-confirmation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemotionSummary {
    /// Records whose archive-tier demotion was confirmed this pass
    pub confirmed: u64,
    /// Records the backend has not demoted yet, including records skipped
    /// because their backend check failed
    pub awaiting: u64,
}

/// Sweeps all pending retrievals against the backend.
pub struct ReconciliationSweeper {
    engine: Arc<LifecycleEngine>,
    concurrency: usize,
}

impl ReconciliationSweeper {
    /// Create a sweeper with the given backend-call concurrency limit.
    pub fn new(engine: Arc<LifecycleEngine>, concurrency: usize) -> Self {
        Self {
            engine,
            concurrency: concurrency.max(1),
        }
    }

    /// Run one full sweep.
    ///
    /// A backend or store failure for one record is logged and the record
    /// stays pending; it never aborts the rest of the batch. Only the
    /// initial pending query can fail the sweep as a whole.
    pub async fn run(&self) -> LifecycleResult<SweepSummary> {
        let pending = self.engine.pending_retrievals()?;
        Logger::debug("SWEEP_BEGIN", &[("pending", &pending.len().to_string())]);

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for record in pending {
            let engine = self.engine.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                // the semaphore lives as long as the tasks; acquire cannot
                // observe it closed
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return ReconcileOutcome::StillPending,
                };
                match engine.reconcile(record.id).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        Logger::warn(
                            "SWEEP_RECORD_FAILED",
                            &[
                                ("error", &e.to_string()),
                                ("record_id", &record.id.to_string()),
                            ],
                        );
                        ReconcileOutcome::StillPending
                    }
                }
            });
        }

        let mut summary = SweepSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(ReconcileOutcome::BecameAvailable) | Ok(ReconcileOutcome::Restored) => {
                    summary.became_available += 1;
                }
                Ok(ReconcileOutcome::StillPending) => summary.still_pending += 1,
                Ok(ReconcileOutcome::RetrievalLapsed)
                | Ok(ReconcileOutcome::AlreadyAdvanced) => {}
                Err(e) => {
                    Logger::error("SWEEP_TASK_FAILED", &[("error", &e.to_string())]);
                    summary.still_pending += 1;
                }
            }
        }

        Logger::info(
            "SWEEP_COMPLETE",
            &[
                ("became_available", &summary.became_available.to_string()),
                ("still_pending", &summary.still_pending.to_string()),
            ],
        );
        Ok(summary)
    }

    /// Confirm archive-tier demotions for records moved to cold storage.
    ///
    /// The backend applies the storage-class transition asynchronously, so
    /// this pass re-checks every cold record still awaiting confirmation and
    /// flips its marker once the backend reports the object in the archive
    /// tier. Confirmed records are never re-queried.
    pub async fn confirm_demotions(&self) -> LifecycleResult<DemotionSummary> {
        let unconfirmed = self.engine.unconfirmed_demotions()?;
        Logger::debug(
            "DEMOTION_CHECK_BEGIN",
            &[("unconfirmed", &unconfirmed.len().to_string())],
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for record in unconfirmed {
            let engine = self.engine.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return false,
                };
                match engine.confirm_demotion(record.id).await {
                    Ok(confirmed) => confirmed,
                    Err(e) => {
                        Logger::warn(
                            "DEMOTION_CHECK_FAILED",
                            &[
                                ("error", &e.to_string()),
                                ("record_id", &record.id.to_string()),
                            ],
                        );
                        false
                    }
                }
            });
        }

        let mut summary = DemotionSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => summary.confirmed += 1,
                Ok(false) => summary.awaiting += 1,
                Err(e) => {
                    Logger::error("DEMOTION_TASK_FAILED", &[("error", &e.to_string())]);
                    summary.awaiting += 1;
                }
            }
        }

        Logger::info(
            "DEMOTION_CHECK_COMPLETE",
            &[
                ("awaiting", &summary.awaiting.to_string()),
                ("confirmed", &summary.confirmed.to_string()),
            ],
        );
        Ok(summary)
    }
}
