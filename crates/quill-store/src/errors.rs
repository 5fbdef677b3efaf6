//! Store error types.

/// Errors raised by the persistence seam.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row for the requested id.
    #[error("not found: {0}")]
    NotFound(String),
    /// A row with the same identity already exists.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backend failed.
    #[error("store backend error: {0}")]
    Backend(String),
}
