//! The [`TextExtractor`] seam and the plain-text implementation.

use crate::errors::ExtractError;

/// Turns raw document bytes into extractable text, dispatching on MIME
/// type. Rich-format decoders live behind this seam in the production
/// deployment.
pub trait TextExtractor: Send + Sync {
    /// Extract text from `data` claimed to be of type `mime_type`.
    fn extract(&self, mime_type: &str, data: &[u8]) -> Result<String, ExtractError>;
}

/// Handles `text/plain` only; anything else is unsupported.
#[derive(Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    /// A plain-text extractor.
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, mime_type: &str, data: &[u8]) -> Result<String, ExtractError> {
        match mime_type {
            "text/plain" => match std::str::from_utf8(data) {
                Ok(text) => Ok(text.to_string()),
                Err(e) => Err(ExtractError::Malformed {
                    mime_type: mime_type.to_string(),
                    message: e.to_string(),
                }),
            },
            other => Err(ExtractError::Unsupported(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_utf8_text() {
        let extractor = PlainTextExtractor::new();
        let text = extractor.extract("text/plain", "hello".as_bytes()).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let extractor = PlainTextExtractor::new();
        let err = extractor.extract("text/plain", &[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, ExtractError::Malformed { .. }));
    }

    #[test]
    fn rejects_unknown_mime() {
        let extractor = PlainTextExtractor::new();
        let err = extractor.extract("application/pdf", b"%PDF").unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
        assert!(err.to_string().contains("not a supported file format"));
    }
}
