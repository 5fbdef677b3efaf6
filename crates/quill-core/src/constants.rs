//! Service-wide constants.

/// Marker byte that opens a framed binary upload.
pub const UPLOAD_FRAME_MARKER: u8 = 0x0B;

/// Storage ceiling for tenants without an active subscription, in bytes.
pub const NON_SUBSCRIBER_STORAGE_LIMIT: i64 = 5_000_000; // 5mb

/// Group key used for manual uploads, which have no source folder.
pub const DEFAULT_GROUP: &str = "default";

/// Sub-topic sentinel meaning "every conversation in the workspace".
pub const CONVERSATION_NIL: &str = "nil";
