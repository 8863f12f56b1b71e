//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// A collision that survives its single retry is not represented here: it
/// is reported as a generation event and the unit still produces output.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A request field is malformed or outside its bound. Raised before any
    /// generation work starts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A lookup on a fingerprint that was never issued.
    #[error("not found: {0}")]
    NotFound(String),

    /// An internal failure (poisoned lock, serialization).
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
