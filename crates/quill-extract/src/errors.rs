//! Extraction error types.

/// Errors raised by a [`crate::TextExtractor`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// No decoder is registered for the MIME type.
    #[error("not a supported file format: {0}")]
    Unsupported(String),
    /// The bytes do not decode under the claimed MIME type.
    #[error("malformed {mime_type} content: {message}")]
    Malformed {
        /// Claimed MIME type.
        mime_type: String,
        /// Decoder detail.
        message: String,
    },
}
