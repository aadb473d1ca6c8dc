//! Common error types for facegate
//!
//! These are faults: infrastructure trouble or broken invariants. Expected
//! business failures travel as [`crate::Outcome::Error`] instead.

use thiserror::Error;

/// Common result type for facegate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across facegate services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Recognition worker pool failure (closed queue, panicked job)
    #[error("Recognition error: {0}")]
    Recognition(String),

    /// Stored data violates an invariant the code relies on
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
