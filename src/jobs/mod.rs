//! # Propagation Jobs
//!
//! Submission seam between the lifecycle engine and the propagation
//! coordinator. The engine fires a job and moves on; it never waits for the
//! fan-out to land. Job status is kept so operators can tell whether a
//! group converged cleanly.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::Logger;
use crate::propagation::{PropagationCoordinator, PropagationRequest};
use crate::record::LifecycleResult;

/// Opaque handle to a submitted propagation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Where a job is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Accepted, not yet running
    Scheduled,
    /// Fan-out in progress
    Running,
    /// Fan-out finished; check `error_count` for per-record failures
    Completed,
}

/// Status of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Current state
    pub state: JobState,
    /// Records that failed during the fan-out
    pub error_count: u64,
}

/// Runner trait the lifecycle engine submits propagation work through.
pub trait JobRunner: Send + Sync {
    /// Submit a propagation job. Returns once the job is accepted, not
    /// once it finishes.
    fn submit(&self, request: PropagationRequest) -> LifecycleResult<JobId>;

    /// Status of a previously submitted job, if known.
    fn status(&self, job_id: JobId) -> Option<JobStatus>;
}

/// Runner that executes each job synchronously on the submitting thread.
pub struct InlineJobRunner {
    coordinator: PropagationCoordinator,
    statuses: RwLock<HashMap<JobId, JobStatus>>,
}

impl InlineJobRunner {
    /// Create a runner driving the given coordinator.
    pub fn new(coordinator: PropagationCoordinator) -> Self {
        Self {
            coordinator,
            statuses: RwLock::new(HashMap::new()),
        }
    }
}

impl JobRunner for InlineJobRunner {
    fn submit(&self, request: PropagationRequest) -> LifecycleResult<JobId> {
        let job_id = JobId::new();
        Logger::debug(
            "PROPAGATION_JOB_SUBMITTED",
            &[
                ("job_id", &job_id.0.to_string()),
                ("seed", &request.seed.to_string()),
            ],
        );

        let report = self.coordinator.run(&request)?;

        let mut statuses = self.statuses.write().unwrap_or_else(|e| e.into_inner());
        statuses.insert(
            job_id,
            JobStatus {
                state: JobState::Completed,
                error_count: report.errors,
            },
        );
        Ok(job_id)
    }

    fn status(&self, job_id: JobId) -> Option<JobStatus> {
        let statuses = self.statuses.read().unwrap_or_else(|e| e.into_inner());
        statuses.get(&job_id).copied()
    }
}
