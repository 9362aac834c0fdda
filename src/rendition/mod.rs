//! # Rendition Provider
//!
//! The seam to the rendition/thumbnail service. When content moves to the
//! cold tier the main slot keeps a placeholder rendition so users can still
//! browse and preview the document.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::record::{Content, LifecycleError, LifecycleResult};

/// Provider trait for placeholder renditions
pub trait RenditionProvider: Send + Sync {
    /// The placeholder content for an entity; `NotFound` when neither a
    /// specific nor a default rendition exists.
    fn placeholder(&self, record_id: Uuid) -> LifecycleResult<Content>;
}

/// Provider with per-record renditions and an optional default fallback.
#[derive(Debug, Default)]
pub struct StaticRenditionProvider {
    by_record: RwLock<HashMap<Uuid, Content>>,
    default: RwLock<Option<Content>>,
}

impl StaticRenditionProvider {
    /// Create a provider with no renditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider serving the same default placeholder to everyone.
    pub fn with_default(content: Content) -> Self {
        let provider = Self::new();
        provider.set_default(content);
        provider
    }

    /// Register a rendition for a specific record.
    pub fn set_rendition(&self, record_id: Uuid, content: Content) {
        let mut by_record = self.by_record.write().unwrap_or_else(|e| e.into_inner());
        by_record.insert(record_id, content);
    }

    /// Set the default fallback rendition.
    pub fn set_default(&self, content: Content) {
        let mut default = self.default.write().unwrap_or_else(|e| e.into_inner());
        *default = Some(content);
    }
}

impl RenditionProvider for StaticRenditionProvider {
    fn placeholder(&self, record_id: Uuid) -> LifecycleResult<Content> {
        {
            let by_record = self.by_record.read().unwrap_or_else(|e| e.into_inner());
            if let Some(content) = by_record.get(&record_id) {
                return Ok(content.clone());
            }
        }
        let default = self.default.read().unwrap_or_else(|e| e.into_inner());
        default.clone().ok_or_else(|| {
            LifecycleError::not_found(format!("no placeholder rendition for record {}", record_id))
        })
    }
}
