//! Lifecycle Error Types

use thiserror::Error;

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Error taxonomy for the cold-storage lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleErrorKind {
    /// No content to act on
    NotFound,

    /// Operation already in the requested target sub-state
    Conflict,

    /// Missing permission, active hold/retention, or guard violation
    Forbidden,

    /// Backend or storage failure
    Internal,
}

/// Lifecycle error carrying a kind and a human-readable message
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LifecycleError {
    /// Error kind
    pub kind: LifecycleErrorKind,
    /// Error message
    pub message: String,
}

impl LifecycleError {
    /// Create a new lifecycle error.
    pub fn new(kind: LifecycleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(LifecycleErrorKind::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(LifecycleErrorKind::Conflict, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(LifecycleErrorKind::Forbidden, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(LifecycleErrorKind::Internal, message)
    }

    /// Create a forbidden state-transition error.
    pub fn forbidden_transition(from: &str, to: &str) -> Self {
        Self::new(
            LifecycleErrorKind::Forbidden,
            format!("forbidden transition: {} -> {}", from, to),
        )
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self.kind {
            LifecycleErrorKind::NotFound => 404,
            LifecycleErrorKind::Conflict => 409,
            LifecycleErrorKind::Forbidden => 403,
            LifecycleErrorKind::Internal => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(LifecycleError::not_found("x").status_code(), 404);
        assert_eq!(LifecycleError::conflict("x").status_code(), 409);
        assert_eq!(LifecycleError::forbidden("x").status_code(), 403);
        assert_eq!(LifecycleError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_forbidden_transition_message() {
        let err = LifecycleError::forbidden_transition("Hot", "Available");
        assert_eq!(err.kind, LifecycleErrorKind::Forbidden);
        assert!(err.message.contains("Hot"));
        assert!(err.message.contains("Available"));
    }

    #[test]
    fn test_display_is_message() {
        let err = LifecycleError::conflict("content is being restored");
        assert_eq!(err.to_string(), "content is being restored");
    }
}
