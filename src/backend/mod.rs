//! # Storage Backend
//!
//! The seam to the physical storage tiers. The backend reports the archive
//! status of an object and accepts asynchronous retrieval requests; it is
//! not implemented here beyond an in-memory simulation.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::LifecycleResult;

pub use memory::InMemoryBackend;

/// Point-in-time status of an archived object, as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Archive tier the object currently sits in. `None` means the backend
    /// has not yet demoted the object (lifecycle transition still pending).
    pub storage_class: Option<String>,
    /// Whether the object's bytes can be read right now
    pub downloadable: bool,
    /// End of the temporary download window, when one exists
    pub downloadable_until: Option<DateTime<Utc>>,
    /// Whether a retrieval request is being processed by the backend
    pub ongoing_restore: bool,
}

impl BackendStatus {
    /// Whether a requested retrieval has been delivered.
    ///
    /// Once the backend confirms the object is in the cold tier, a delivered
    /// retrieval always carries a download window; before the demotion takes
    /// effect the object is simply still readable and `downloadable` alone
    /// decides.
    pub fn is_retrieved(&self) -> bool {
        match self.storage_class {
            Some(_) => self.downloadable && self.downloadable_until.is_some(),
            None => self.downloadable,
        }
    }
}

/// Backend trait for the archival storage tier
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Report the status of the object at `key`.
    async fn status(&self, key: &str) -> LifecycleResult<BackendStatus>;

    /// Request an asynchronous retrieval of the object at `key`, keeping it
    /// downloadable for `duration` once delivered.
    async fn initiate_restore(&self, key: &str, duration: Duration) -> LifecycleResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieved_requires_window_once_demoted() {
        let status = BackendStatus {
            storage_class: Some("ARCHIVE".to_string()),
            downloadable: true,
            downloadable_until: None,
            ongoing_restore: false,
        };
        assert!(!status.is_retrieved());

        let status = BackendStatus {
            downloadable_until: Some(Utc::now()),
            ..status
        };
        assert!(status.is_retrieved());
    }

    #[test]
    fn test_downloadable_alone_decides_before_demotion() {
        let status = BackendStatus {
            storage_class: None,
            downloadable: true,
            downloadable_until: None,
            ongoing_restore: false,
        };
        assert!(status.is_retrieved());
    }
}
