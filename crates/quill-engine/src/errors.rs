//! Engine error taxonomy.
//!
//! Batch-level failures (`Auth`, `Quota`) abort before any stage runs and
//! surface as one typed error envelope. Everything else is an item-level
//! failure: recorded as a Failed event on that item while the batch
//! proceeds.

use quill_embeddings::EmbeddingError;
use quill_extract::ExtractError;
use quill_index::IndexError;
use quill_remote::RemoteError;
use quill_store::StoreError;

/// Errors raised by the ingestion engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The remote credential is missing, expired, or under-scoped.
    #[error("remote access denied ({status}): {message}")]
    Auth {
        /// HTTP-style status carried to the error envelope.
        status: u16,
        /// Human-readable reason.
        message: String,
    },
    /// The tenant's projected storage exceeds its ceiling.
    #[error("storage quota exceeded: {0}")]
    Quota(String),
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Vector-index failure.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Non-auth remote-service failure.
    #[error(transparent)]
    Remote(RemoteError),
    /// Extraction failure.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Embedding failure.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Opaque responder failure on the query path.
    #[error("responder error: {0}")]
    Responder(String),
}

impl From<RemoteError> for EngineError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized { status, message } => Self::Auth { status, message },
            other => Self::Remote(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_remote_maps_to_auth() {
        let err: EngineError = RemoteError::no_credential().into();
        assert!(matches!(err, EngineError::Auth { status: 401, .. }));
    }

    #[test]
    fn other_remote_errors_stay_remote() {
        let err: EngineError = RemoteError::NotFound("item".into()).into();
        assert!(matches!(err, EngineError::Remote(RemoteError::NotFound(_))));
    }
}
