//! # Content Records
//!
//! The data model of the cold-storage lifecycle: the content value type, the
//! record state machine, the error taxonomy, and the record store seam.

pub mod content;
pub mod errors;
pub mod memory;
pub mod state;
pub mod store;

pub use content::Content;
pub use errors::{LifecycleError, LifecycleErrorKind, LifecycleResult};
pub use memory::InMemoryStore;
pub use state::{ContentRecord, ContentState, RetrievalGoal};
pub use store::{Principal, RecordStore};
