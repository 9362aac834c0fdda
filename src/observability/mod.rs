//! # Observability
//!
//! Structured logging for the lifecycle engine, the sweep and the
//! propagation jobs.

pub mod logger;

pub use logger::{Logger, Severity};
