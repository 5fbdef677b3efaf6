//! # quill-engine
//!
//! The ingestion/synchronization core:
//!
//! - **Reconcile**: pure three-way diff between the local ledger and a live
//!   remote listing ([`reconcile::reconcile`])
//! - **Reporter**: formats stage transitions and publishes them through the
//!   [`reporter::Broadcaster`] seam
//! - **Pipeline**: the per-item stage functions (fetch → parse → split →
//!   embed → upload → persist)
//! - **Orchestrator**: [`orchestrator::JobOrchestrator`]: quota gate,
//!   bounded concurrency, shared manifest, exactly-once terminal broadcast
//! - **Query**: similarity-search and analysis flows consumed opaquely by
//!   the session ([`query::QueryPath`])
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on the collaborator seams (store, index,
//! remote, extract, embeddings) and quill-core.
//! Depended on by: quill-server.

#![deny(unsafe_code)]

pub mod errors;
pub mod orchestrator;
pub mod pipeline;
pub mod query;
pub mod reconcile;
pub mod reporter;

pub use errors::EngineError;
pub use orchestrator::{BatchOutcome, JobOrchestrator, OrchestratorDeps};
pub use query::{EchoResponder, QueryPath, Responder};
pub use reconcile::{LedgerRecord, Reconciliation, reconcile};
pub use reporter::{Broadcaster, MemoryBroadcaster, ProgressReporter};
