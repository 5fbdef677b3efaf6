//! Export-type mapping for provider-native documents.

/// MIME type the remote reports for its own native document format.
/// Items of this type must be exported rather than downloaded.
pub const NATIVE_DOCUMENT_MIME: &str = "application/vnd.remote.document";

/// The format an item's bytes will arrive in.
///
/// Native documents export to plain text; everything else downloads
/// as-is, so its own MIME type is returned.
pub fn export_type_for(mime_type: &str) -> &str {
    if mime_type == NATIVE_DOCUMENT_MIME {
        "text/plain"
    } else {
        mime_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_documents_export_to_plain_text() {
        assert_eq!(export_type_for(NATIVE_DOCUMENT_MIME), "text/plain");
    }

    #[test]
    fn other_types_pass_through() {
        assert_eq!(export_type_for("application/pdf"), "application/pdf");
        assert_eq!(export_type_for("text/plain"), "text/plain");
    }
}
