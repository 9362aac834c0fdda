//! # Lifecycle Engine
//!
//! The single entry point for cold-storage transitions. Operations run
//! synchronously in the caller's unit of work, surface errors to the
//! caller, and leave record state untouched on failure.

pub mod engine;

pub use engine::LifecycleEngine;
pub(crate) use engine::ReconcileOutcome;
