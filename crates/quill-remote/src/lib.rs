//! # quill-remote
//!
//! The remote-folder seam: listing a folder's live children, fetching item
//! bytes, and exporting provider-native documents to portable formats.
//! The vendor client is an external collaborator; this crate ships the
//! [`RemoteFolderService`] trait, the listing types the reconciliation
//! engine consumes, and a scriptable fixture implementation.
//!
//! ## Crate Position
//!
//! Standalone (no quill crate dependencies).
//! Depended on by: quill-engine, quill-server.

#![deny(unsafe_code)]

pub mod errors;
pub mod export;
pub mod fixture;
pub mod service;
pub mod types;

pub use errors::RemoteError;
pub use export::{NATIVE_DOCUMENT_MIME, export_type_for};
pub use fixture::FixtureRemote;
pub use service::RemoteFolderService;
pub use types::{RemoteFolder, RemoteItem};
