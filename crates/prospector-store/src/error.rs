//! Work store error types.
//!
//! Provides error handling for store operations using `thiserror`. The
//! [`StoreError::InvalidStateTransition`] variant is the consistency fault
//! of the state machine: it is never auto-corrected and the stored row is
//! left untouched when it is raised.

use prospector_core::TargetState;
use thiserror::Error;

/// Work-store-specific errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or create database connection.
    #[error("failed to open work store: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// An operation would violate the target state machine.
    #[error("invalid state transition for {url}: {from} -> {attempted}")]
    InvalidStateTransition {
        /// The target's profile URL
        url: String,
        /// State observed in the store
        from: TargetState,
        /// State the operation attempted to enter
        attempted: TargetState,
    },

    /// Target with the given identifier does not exist.
    #[error("target not found: {0}")]
    NotFound(String),

    /// Failed to decode a stored value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error during store operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let err = StoreError::InvalidStateTransition {
            url: "https://www.example.com/in/jane".to_string(),
            from: TargetState::Pending,
            attempted: TargetState::Completed,
        };
        assert_eq!(
            err.to_string(),
            "invalid state transition for https://www.example.com/in/jane: pending -> completed"
        );
    }
}
