//! # quill-store
//!
//! The narrow persistence seam the ingestion engine writes through:
//! document rows, per-tenant totals and subscription state, synced-folder
//! entries, and the ledger of previously synchronized remote items.
//! Also the [`UsageMeter`] billing seam.
//!
//! The relational backend itself is an external collaborator; this crate
//! ships the traits plus in-memory implementations for tests and local
//! runs.
//!
//! ## Crate Position
//!
//! Depends on: quill-core.
//! Depended on by: quill-engine, quill-server.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod meter;
pub mod store;
pub mod types;

pub use errors::StoreError;
pub use memory::MemoryDocumentStore;
pub use meter::{RecordingUsageMeter, UsageMeter, UsageRecord};
pub use store::DocumentStore;
pub use types::{Document, FolderEntry, LedgerEntry};
