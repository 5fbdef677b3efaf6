//! Remote service error types.

/// Errors raised by a [`crate::RemoteFolderService`].
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The credential is missing, expired, or lacks the required scope.
    #[error("remote access denied ({status}): {message}")]
    Unauthorized {
        /// HTTP-style status carried to the error envelope.
        status: u16,
        /// Human-readable reason.
        message: String,
    },
    /// No such folder or item.
    #[error("remote item not found: {0}")]
    NotFound(String),
    /// The remote service failed.
    #[error("remote service error: {0}")]
    Service(String),
}

impl RemoteError {
    /// A missing-credential rejection.
    pub fn no_credential() -> Self {
        Self::Unauthorized {
            status: 401,
            message: "no remote account connected".to_string(),
        }
    }

    /// An insufficient-scope rejection.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            status: 403,
            message: message.into(),
        }
    }
}
