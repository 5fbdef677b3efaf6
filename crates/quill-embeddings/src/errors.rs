//! Embedding error types.

/// Errors raised by an [`crate::Embedder`].
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// The backing model produced no output or malformed output.
    #[error("embedding inference failed: {0}")]
    Inference(String),
    /// The provider rejected or could not serve the request.
    #[error("embedding provider unavailable: {0}")]
    Provider(String),
}

/// Convenience alias for embedding results.
pub type Result<T> = std::result::Result<T, EmbeddingError>;
