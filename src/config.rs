//! Cold Storage Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColdStorageConfig {
    /// Days a retrieval stays downloadable when a restore has to go through
    /// a retrieval first (default: 1)
    #[serde(default = "default_availability_days")]
    pub availability_days: u32,

    /// Timeout for a single storage backend call, in seconds (default: 30)
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// Upper bound on concurrent backend calls during a sweep (default: 8)
    #[serde(default = "default_sweep_concurrency")]
    pub sweep_concurrency: usize,
}

fn default_availability_days() -> u32 {
    1
}

fn default_backend_timeout_secs() -> u64 {
    30
}

fn default_sweep_concurrency() -> usize {
    8
}

impl Default for ColdStorageConfig {
    fn default() -> Self {
        Self {
            availability_days: default_availability_days(),
            backend_timeout_secs: default_backend_timeout_secs(),
            sweep_concurrency: default_sweep_concurrency(),
        }
    }
}

impl ColdStorageConfig {
    /// The default availability window for retrievals submitted on behalf
    /// of a restore.
    pub fn default_availability(&self) -> Duration {
        Duration::from_secs(u64::from(self.availability_days) * 86_400)
    }

    /// The backend call timeout.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }
}
