//! # quill-extract
//!
//! Text extraction and chunking for the ingestion pipeline. Extraction
//! proper (PDF, EPUB, word-processor formats) is an external collaborator
//! behind the [`TextExtractor`] trait; this crate ships the seam, the
//! plain-text implementation, and the fixed-size overlap splitter.
//!
//! ## Crate Position
//!
//! Standalone (no quill crate dependencies).
//! Depended on by: quill-engine, quill-server.

#![deny(unsafe_code)]

pub mod errors;
pub mod extractor;
pub mod split;

pub use errors::ExtractError;
pub use extractor::{PlainTextExtractor, TextExtractor};
pub use split::split_text;
