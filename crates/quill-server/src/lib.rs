//! # quill-server
//!
//! WebSocket serving for the Quill knowledge-base service.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `hub` | Topic → sub-topic subscriber registry, run as a single actor |
//! | `session` | Per-connection reader/writer tasks, dispatch, liveness |
//! | `protocol` | Binary upload frame codec |
//! | `app` | Axum router, application state, HTTP endpoints |
//! | `metrics` | Prometheus recorder and metric name constants |
//!
//! ## Data Flow
//!
//! `session` (reader) → orchestrator / query path → `hub` → every
//! subscribed session's writer.

#![deny(unsafe_code)]

pub mod app;
pub mod hub;
pub mod metrics;
pub mod protocol;
pub mod session;

pub use app::{AppState, router};
pub use hub::Hub;
