//! # quill-index
//!
//! The vector-index seam: one collection per tenant, points filtered by
//! workspace, grouped similarity search by document. The production index
//! is an external service; this crate ships the [`VectorIndex`] trait and
//! an in-memory cosine implementation for tests and local runs.
//!
//! ## Crate Position
//!
//! Depends on: quill-embeddings (vector math).
//! Depended on by: quill-engine, quill-server.

#![deny(unsafe_code)]

pub mod errors;
pub mod index;
pub mod memory;

pub use errors::IndexError;
pub use index::{DocumentHits, ScoredChunk, SearchOptions, VectorIndex};
pub use memory::MemoryVectorIndex;
