//! Index error types.

/// Errors raised by a [`crate::VectorIndex`].
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// No collection exists for the tenant.
    #[error("no collection for org {0}")]
    MissingCollection(String),
    /// A vector's dimensionality does not match its collection.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Collection dimensionality.
        expected: usize,
        /// Offending vector dimensionality.
        got: usize,
    },
    /// The index service failed.
    #[error("index backend error: {0}")]
    Backend(String),
}
