//! Prometheus metrics recorder and the `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render the `/metrics` endpoint. Must be
/// called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

// Metric name constants to avoid typos across crates.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Broadcast drops total (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Inbound frames that failed to decode (counter).
pub const WS_DECODE_FAILURES_TOTAL: &str = "ws_decode_failures_total";
/// Items currently running pipeline stages (gauge).
pub const INGEST_ITEMS_ACTIVE: &str = "ingest_items_active";
/// Batches accepted total (counter).
pub const INGEST_BATCHES_TOTAL: &str = "ingest_batches_total";
/// Item-level stage failures total (counter).
pub const INGEST_ITEM_FAILURES_TOTAL: &str = "ingest_item_failures_total";
