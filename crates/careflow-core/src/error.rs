//! Careflow error types.

use thiserror::Error;

/// Convenience result alias used across the workspace.
pub type Result<T> = std::result::Result<T, CareflowError>;

/// All errors the Careflow crates can produce.
///
/// The gateway maps these onto HTTP responses: `Validation` becomes a 400
/// with its message, everything else becomes a generic 500 (internal detail
/// is logged, never sent to the caller).
#[derive(Debug, Error)]
pub enum CareflowError {
    /// A required request or record field is missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist in the store.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Communication with the external record store failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
