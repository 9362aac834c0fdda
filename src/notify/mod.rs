//! # Lifecycle Events
//!
//! Typed events emitted by the engine for downstream consumers (mail
//! notification fan-out, search re-indexing suppression). Publication is
//! fire-and-forget: a sink must never fail the emitting operation.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::observability::{Logger, Severity};

/// Observable lifecycle events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Main content was relocated to the cold tier
    Moved { record_id: Uuid },
    /// A retrieval request was submitted to the backend
    RetrievalRequested { record_id: Uuid },
    /// A temporary retrieval was delivered and the content is downloadable
    Available {
        record_id: Uuid,
        downloadable_until: Option<DateTime<Utc>>,
        download_ref: String,
    },
    /// The content was permanently restored to hot storage
    Restored { record_id: Uuid },
}

impl LifecycleEvent {
    /// Returns the stable event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Moved { .. } => "COLD_CONTENT_MOVED",
            Self::RetrievalRequested { .. } => "COLD_CONTENT_RETRIEVAL_REQUESTED",
            Self::Available { .. } => "COLD_CONTENT_AVAILABLE",
            Self::Restored { .. } => "COLD_CONTENT_RESTORED",
        }
    }

    /// The record the event concerns
    pub fn record_id(&self) -> Uuid {
        match self {
            Self::Moved { record_id }
            | Self::RetrievalRequested { record_id }
            | Self::Available { record_id, .. }
            | Self::Restored { record_id } => *record_id,
        }
    }
}

/// Sink trait for lifecycle events
pub trait NotificationSink: Send + Sync {
    /// Publish an event. Must not fail; delivery is best-effort.
    fn publish(&self, event: LifecycleEvent);
}

/// Sink that writes events to the structured log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn publish(&self, event: LifecycleEvent) {
        let record_id = event.record_id().to_string();
        let mut fields: Vec<(&str, String)> = vec![("record_id", record_id)];
        if let LifecycleEvent::Available {
            downloadable_until,
            download_ref,
            ..
        } = &event
        {
            if let Some(until) = downloadable_until {
                fields.push(("available_until", until.to_rfc3339()));
            }
            fields.push(("archive_location", download_ref.clone()));
        }
        let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        Logger::log(Severity::Info, event.name(), &borrowed);
    }
}

/// Sink that records published events for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far.
    pub fn published(&self) -> Vec<LifecycleEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.clone()
    }

    /// Events with the given name, in publication order.
    pub fn published_named(&self, name: &str) -> Vec<LifecycleEvent> {
        self.published()
            .into_iter()
            .filter(|e| e.name() == name)
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, event: LifecycleEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }
}
